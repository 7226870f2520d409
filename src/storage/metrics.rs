use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::model::ElementKind;

/// Hook for counting graph operations.
///
/// Implementations receive a call for every committed element save, element
/// delete, property write and path search. Nothing is exported; callers read
/// the counters themselves.
pub trait GraphMetrics: Send + Sync {
    /// Records a committed element mutation.
    fn element_saved(&self, kind: ElementKind);

    /// Records an element delete.
    ///
    /// # Parameters
    /// * `soft` - `true` for a soft delete, `false` for a hard delete.
    fn element_deleted(&self, kind: ElementKind, soft: bool);

    /// Records one property value write.
    fn property_written(&self);

    /// Records a path search and the number of paths it returned.
    fn path_search(&self, paths_found: usize);
}

/// A [`GraphMetrics`] that discards everything.
#[derive(Default)]
pub struct NoopMetrics;

impl GraphMetrics for NoopMetrics {
    fn element_saved(&self, _kind: ElementKind) {}
    fn element_deleted(&self, _kind: ElementKind, _soft: bool) {}
    fn property_written(&self) {}
    fn path_search(&self, _paths_found: usize) {}
}

/// Atomic counter implementation of [`GraphMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Vertex mutations committed.
    pub vertices_saved: AtomicU64,

    /// Edge mutations committed.
    pub edges_saved: AtomicU64,

    /// Vertices hard-deleted.
    pub vertices_deleted: AtomicU64,

    /// Edges hard-deleted.
    pub edges_deleted: AtomicU64,

    /// Vertices soft-deleted.
    pub vertices_soft_deleted: AtomicU64,

    /// Edges soft-deleted.
    pub edges_soft_deleted: AtomicU64,

    /// Property values written.
    pub property_writes: AtomicU64,

    /// Path searches executed.
    pub path_searches: AtomicU64,

    /// Paths returned across all searches.
    pub paths_found: AtomicU64,
}

impl CounterMetrics {
    /// Reads a counter.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

impl GraphMetrics for CounterMetrics {
    fn element_saved(&self, kind: ElementKind) {
        match kind {
            ElementKind::Vertex => self.vertices_saved.fetch_add(1, Ordering::Relaxed),
            ElementKind::Edge => self.edges_saved.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn element_deleted(&self, kind: ElementKind, soft: bool) {
        let counter = match (kind, soft) {
            (ElementKind::Vertex, false) => &self.vertices_deleted,
            (ElementKind::Vertex, true) => &self.vertices_soft_deleted,
            (ElementKind::Edge, false) => &self.edges_deleted,
            (ElementKind::Edge, true) => &self.edges_soft_deleted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn property_written(&self) {
        self.property_writes.fetch_add(1, Ordering::Relaxed);
    }

    fn path_search(&self, paths_found: usize) {
        self.path_searches.fetch_add(1, Ordering::Relaxed);
        self.paths_found
            .fetch_add(paths_found as u64, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation ([`NoopMetrics`]).
pub fn default_metrics() -> Arc<dyn GraphMetrics> {
    Arc::new(NoopMetrics)
}
