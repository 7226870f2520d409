use std::sync::Arc;

use serde_json::Value;

use super::record::ElementRecord;
use crate::error::Result;
use crate::model::{ElementId, ElementKind};

/// Physical backend holding element records and graph metadata.
///
/// The graph core is written only against this trait. Records handed out are
/// immutable snapshots; writers publish replacements through [`ElementStore::put_all`].
pub trait ElementStore: Send + Sync {
    /// Record for an element, tombstoned or not.
    fn get(&self, id: &ElementId) -> Result<Option<Arc<ElementRecord>>>;

    /// Publishes a set of records together; readers see all of them or none.
    fn put_all(&self, records: Vec<Arc<ElementRecord>>) -> Result<()>;

    /// Publishes one record.
    fn put(&self, record: Arc<ElementRecord>) -> Result<()> {
        self.put_all(vec![record])
    }

    /// Removes a record, returning it if it existed.
    fn remove(&self, id: &ElementId) -> Result<Option<Arc<ElementRecord>>>;

    /// Snapshot of every record of one kind, ordered by id.
    fn scan(&self, kind: ElementKind) -> Result<Vec<Arc<ElementRecord>>>;

    /// Graph metadata value.
    fn get_metadata(&self, key: &str) -> Result<Option<Value>>;

    /// Stores a graph metadata value.
    fn set_metadata(&self, key: &str, value: Value) -> Result<()>;

    /// Removes a graph metadata value.
    fn remove_metadata(&self, key: &str) -> Result<Option<Value>>;

    /// Every metadata key.
    fn metadata_keys(&self) -> Result<Vec<String>>;

    /// Removes every element record, keeping metadata.
    fn truncate(&self) -> Result<()>;

    /// Removes everything.
    fn clear(&self) -> Result<()>;

    /// Makes earlier writes durable. A no-op for memory-backed stores.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
