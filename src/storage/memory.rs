use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::record::ElementRecord;
use super::store::ElementStore;
use crate::error::Result;
use crate::model::{ElementId, ElementKind};

#[derive(Default)]
struct Tables {
    vertices: BTreeMap<String, Arc<ElementRecord>>,
    edges: BTreeMap<String, Arc<ElementRecord>>,
    metadata: BTreeMap<String, Value>,
}

impl Tables {
    fn table(&self, kind: ElementKind) -> &BTreeMap<String, Arc<ElementRecord>> {
        match kind {
            ElementKind::Vertex => &self.vertices,
            ElementKind::Edge => &self.edges,
        }
    }

    fn table_mut(&mut self, kind: ElementKind) -> &mut BTreeMap<String, Arc<ElementRecord>> {
        match kind {
            ElementKind::Vertex => &mut self.vertices,
            ElementKind::Edge => &mut self.edges,
        }
    }
}

/// In-process [`ElementStore`] backed by ordered maps behind one `RwLock`.
#[derive(Default)]
pub struct MemoryElementStore {
    tables: RwLock<Tables>,
}

impl MemoryElementStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records (live or tombstoned) of one kind.
    pub fn len(&self, kind: ElementKind) -> usize {
        self.tables.read().table(kind).len()
    }
}

impl ElementStore for MemoryElementStore {
    fn get(&self, id: &ElementId) -> Result<Option<Arc<ElementRecord>>> {
        Ok(self.tables.read().table(id.kind).get(&id.id).cloned())
    }

    fn put_all(&self, records: Vec<Arc<ElementRecord>>) -> Result<()> {
        let mut tables = self.tables.write();
        for record in records {
            tables
                .table_mut(record.id.kind)
                .insert(record.id.id.clone(), record);
        }
        Ok(())
    }

    fn remove(&self, id: &ElementId) -> Result<Option<Arc<ElementRecord>>> {
        Ok(self.tables.write().table_mut(id.kind).remove(&id.id))
    }

    fn scan(&self, kind: ElementKind) -> Result<Vec<Arc<ElementRecord>>> {
        Ok(self.tables.read().table(kind).values().cloned().collect())
    }

    fn get_metadata(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.tables.read().metadata.get(key).cloned())
    }

    fn set_metadata(&self, key: &str, value: Value) -> Result<()> {
        self.tables.write().metadata.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove_metadata(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.tables.write().metadata.remove(key))
    }

    fn metadata_keys(&self) -> Result<Vec<String>> {
        Ok(self.tables.read().metadata.keys().cloned().collect())
    }

    fn truncate(&self) -> Result<()> {
        let mut tables = self.tables.write();
        tables.vertices.clear();
        tables.edges.clear();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.tables.write() = Tables::default();
        Ok(())
    }
}
