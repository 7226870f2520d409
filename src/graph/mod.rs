//! The graph facade: security checks, commits, reads, traversal, events and
//! search forwarding.

mod path;
mod read;
mod write;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::MonotonicClock;
use crate::error::{GraphError, Result};
use crate::events::{GraphEvent, ListenerHandle, ListenerRegistry};
use crate::model::{ElementId, Vertex, Edge};
use crate::mutation::{EdgeMutation, MutationTarget, VertexMutation};
use crate::search::{GraphQuery, NoopSearchIndex, SearchIndex};
use crate::security::{Authorizations, Visibility};
use crate::storage::{default_metrics, ExtendedDataStore, ElementStore, GraphMetrics, GraphOptions};

pub use path::FindPathOptions;

/// A property graph with cell-level visibility, soft delete, history and
/// extended data.
///
/// Every operation validates the caller's [`Authorizations`] first. Commits
/// are serialized by one lock; reads work on immutable record snapshots and
/// never block writers for longer than a map lookup.
pub struct Graph {
    store: Arc<dyn ElementStore>,
    index: Arc<dyn SearchIndex>,
    metrics: Arc<dyn GraphMetrics>,
    extended: ExtendedDataStore,
    clock: MonotonicClock,
    commit_lock: Mutex<()>,
    listeners: ListenerRegistry,
    strict_write_visibility: bool,
    granted_authorizations: Option<BTreeSet<String>>,
    default_query_limit: usize,
    max_path_hops: usize,
    shut_down: AtomicBool,
    id_seq: AtomicU64,
}

impl Graph {
    /// Opens a graph over the configured store and collaborators.
    pub fn open(options: GraphOptions) -> Result<Self> {
        let GraphOptions {
            store,
            search_index,
            metrics,
            strict_write_visibility,
            granted_authorizations,
            default_query_limit,
            max_path_hops,
        } = options;
        if default_query_limit == 0 {
            return Err(GraphError::InvalidArgument(
                "default_query_limit must be positive".into(),
            ));
        }
        info!(
            strict_write_visibility,
            default_query_limit, max_path_hops, "graph.open"
        );
        Ok(Self {
            store,
            index: search_index.unwrap_or_else(|| Arc::new(NoopSearchIndex) as Arc<dyn SearchIndex>),
            metrics: metrics.unwrap_or_else(default_metrics),
            extended: ExtendedDataStore::new(),
            clock: MonotonicClock::new(),
            commit_lock: Mutex::new(()),
            listeners: ListenerRegistry::default(),
            strict_write_visibility,
            granted_authorizations,
            default_query_limit,
            max_path_hops,
            shut_down: AtomicBool::new(false),
            id_seq: AtomicU64::new(0),
        })
    }

    /// Opens an empty in-memory graph with default options.
    pub fn in_memory() -> Result<Self> {
        Self::open(GraphOptions::in_memory())
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(GraphError::ShutDown);
        }
        Ok(())
    }

    /// Validates `auths` and, when an allow-list is configured, checks every
    /// label was granted.
    pub fn check_authorizations(&self, auths: &Authorizations) -> Result<()> {
        self.ensure_open()?;
        auths.validate()?;
        if let Some(granted) = &self.granted_authorizations {
            auths.ensure_granted(granted)?;
        }
        Ok(())
    }

    /// Returns whether `auths` satisfies `visibility`, after validating `auths`.
    pub fn is_visibility_valid(&self, visibility: &Visibility, auths: &Authorizations) -> Result<bool> {
        self.check_authorizations(auths)?;
        Ok(visibility.evaluate(auths))
    }

    /// Next tick of the graph clock. Strictly greater than every earlier tick.
    pub fn current_time(&self) -> i64 {
        self.clock.tick()
    }

    /// Fresh element id.
    pub fn generate_id(&self) -> String {
        let seq = self.id_seq.fetch_add(1, Ordering::Relaxed);
        format!("{:x}{:06x}", self.clock.tick(), seq & 0xff_ffff)
    }

    /// Starts a vertex mutation. An existing live id is updated in place; a
    /// soft-deleted id starts over with no properties.
    pub fn prepare_vertex(
        &self,
        id: Option<&str>,
        timestamp: Option<i64>,
        visibility: &Visibility,
        concept_type: &str,
    ) -> VertexMutation<'_> {
        VertexMutation::new(
            self,
            MutationTarget::NewVertex {
                id: id.map_or_else(|| self.generate_id(), str::to_owned),
                visibility: visibility.clone(),
                concept_type: concept_type.to_owned(),
                timestamp,
            },
        )
    }

    /// Creates (or updates) a vertex with no properties.
    pub fn add_vertex(&self, id: Option<&str>, visibility: &Visibility, auths: &Authorizations) -> Result<Vertex> {
        self.prepare_vertex(id, None, visibility, "").save(auths)
    }

    /// Starts an edge mutation. Both endpoints must exist when it is saved.
    pub fn prepare_edge(
        &self,
        id: Option<&str>,
        out_vertex_id: &str,
        in_vertex_id: &str,
        label: &str,
        visibility: &Visibility,
    ) -> EdgeMutation<'_> {
        EdgeMutation::new(
            self,
            MutationTarget::NewEdge {
                id: id.map_or_else(|| self.generate_id(), str::to_owned),
                out_vertex_id: out_vertex_id.to_owned(),
                in_vertex_id: in_vertex_id.to_owned(),
                label: label.to_owned(),
                visibility: visibility.clone(),
                timestamp: None,
            },
        )
    }

    /// Creates (or updates) an edge with no properties.
    pub fn add_edge(
        &self,
        id: Option<&str>,
        out_vertex_id: &str,
        in_vertex_id: &str,
        label: &str,
        visibility: &Visibility,
        auths: &Authorizations,
    ) -> Result<Edge> {
        self.prepare_edge(id, out_vertex_id, in_vertex_id, label, visibility)
            .save(auths)
    }

    /// Starts a mutation of an existing vertex.
    pub fn mutate_vertex(&self, id: &str) -> VertexMutation<'_> {
        VertexMutation::new(self, MutationTarget::Existing(ElementId::vertex(id)))
    }

    /// Starts a mutation of an existing edge.
    pub fn mutate_edge(&self, id: &str) -> EdgeMutation<'_> {
        EdgeMutation::new(self, MutationTarget::Existing(ElementId::edge(id)))
    }

    /// Starts a search. The text is `*` or whitespace-separated terms.
    pub fn query<'g>(&'g self, text: &str, auths: &Authorizations) -> GraphQuery<'g> {
        GraphQuery::new(self, text, auths.clone(), self.default_query_limit)
    }

    pub(crate) fn search_index(&self) -> &dyn SearchIndex {
        self.index.as_ref()
    }

    /// Stores a graph-wide configuration value. Not visibility-scoped.
    pub fn set_metadata(&self, key: &str, value: Value) -> Result<()> {
        self.ensure_open()?;
        self.store.set_metadata(key, value)
    }

    /// Reads a graph-wide configuration value.
    pub fn get_metadata(&self, key: &str) -> Result<Option<Value>> {
        self.ensure_open()?;
        self.store.get_metadata(key)
    }

    /// Removes a graph-wide configuration value, returning it.
    pub fn remove_metadata(&self, key: &str) -> Result<Option<Value>> {
        self.ensure_open()?;
        self.store.remove_metadata(key)
    }

    /// Every graph-wide configuration key.
    pub fn metadata_keys(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        self.store.metadata_keys()
    }

    /// Registers a listener invoked synchronously for every committed event.
    ///
    /// Listeners run while the commit lock is held and must not write to the graph.
    pub fn add_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&GraphEvent) + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener))
    }

    /// Unregisters a listener; returns whether it was registered.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        self.listeners.remove(handle)
    }

    /// Flushes the store and the search index. Saves are visible once they
    /// return; after `flush` they are also durable and searchable.
    pub fn flush(&self) -> Result<()> {
        self.ensure_open()?;
        let _guard = self.commit_lock.lock();
        self.store.flush()?;
        self.index.flush()?;
        debug!("graph.flush");
        Ok(())
    }

    /// Removes every element, extended-data row and index document. Graph
    /// metadata is kept.
    pub fn truncate(&self) -> Result<()> {
        self.ensure_open()?;
        let _guard = self.commit_lock.lock();
        self.store.truncate()?;
        self.extended.clear();
        self.index.truncate()?;
        info!("graph.truncate");
        Ok(())
    }

    /// Removes everything, graph metadata and the search index included.
    pub fn drop_all(&self) -> Result<()> {
        self.ensure_open()?;
        let _guard = self.commit_lock.lock();
        self.store.clear()?;
        self.extended.clear();
        self.index.drop_index()?;
        info!("graph.drop");
        Ok(())
    }

    /// Flushes and closes the graph. Every later call fails with
    /// [`GraphError::ShutDown`]; a second shutdown is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        if self.shut_down.load(Ordering::Acquire) {
            return Ok(());
        }
        let flushed = self.flush();
        self.shut_down.store(true, Ordering::Release);
        self.listeners.clear();
        if let Err(err) = &flushed {
            warn!(error = %err, "graph.shutdown.flush_failed");
        }
        info!("graph.shutdown");
        flushed
    }
}
