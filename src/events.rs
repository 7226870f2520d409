//! Graph events and the per-graph listener registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::{ElementId, ExtendedDataRowId, PropValue, PropertyKey};
use crate::security::Visibility;

/// Change notification delivered to listeners after a commit.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
    /// A vertex was created (or re-created after a soft delete).
    AddVertex {
        /// Vertex id.
        vertex_id: String,
    },
    /// An edge was created (or re-created after a soft delete).
    AddEdge {
        /// Edge id.
        edge_id: String,
        /// Vertex the edge leaves.
        out_vertex_id: String,
        /// Vertex the edge arrives at.
        in_vertex_id: String,
        /// Edge label.
        label: String,
    },
    /// A property value was written.
    AddProperty {
        /// Owning element.
        element: ElementId,
        /// Property identity.
        property: PropertyKey,
        /// Value written.
        value: PropValue,
    },
    /// A property was deleted.
    DeleteProperty {
        /// Owning element.
        element: ElementId,
        /// Property identity.
        property: PropertyKey,
        /// `true` for a soft delete.
        soft: bool,
    },
    /// A vertex was deleted.
    DeleteVertex {
        /// Vertex id.
        vertex_id: String,
        /// `true` for a soft delete.
        soft: bool,
    },
    /// An edge was deleted.
    DeleteEdge {
        /// Edge id.
        edge_id: String,
        /// `true` for a soft delete.
        soft: bool,
    },
    /// An element or one of its properties was hidden for a visibility.
    MarkHidden {
        /// Affected element.
        element: ElementId,
        /// Affected property; `None` when the element itself was hidden.
        property: Option<PropertyKey>,
        /// Visibility hidden for.
        visibility: Visibility,
    },
    /// An element or one of its properties was shown again for a visibility.
    MarkVisible {
        /// Affected element.
        element: ElementId,
        /// Affected property; `None` for the element itself.
        property: Option<PropertyKey>,
        /// Visibility shown for.
        visibility: Visibility,
    },
    /// An extended-data cell was written.
    AddExtendedData {
        /// Row identity.
        row: ExtendedDataRowId,
        /// Column name.
        column: String,
        /// Multivalue key.
        key: String,
        /// Value written.
        value: PropValue,
        /// Cell visibility.
        visibility: Visibility,
    },
    /// An extended-data cell or row was deleted.
    DeleteExtendedData {
        /// Row identity.
        row: ExtendedDataRowId,
        /// Column name; `None` when the whole row was deleted.
        column: Option<String>,
    },
}

impl GraphEvent {
    /// Position of the event class within one commit: element-level changes,
    /// then property changes, then extended data.
    pub(crate) fn commit_rank(&self) -> u8 {
        match self {
            GraphEvent::AddVertex { .. }
            | GraphEvent::AddEdge { .. }
            | GraphEvent::DeleteVertex { .. }
            | GraphEvent::DeleteEdge { .. } => 0,
            GraphEvent::MarkHidden { property, .. } | GraphEvent::MarkVisible { property, .. } => {
                if property.is_some() {
                    1
                } else {
                    0
                }
            }
            GraphEvent::AddProperty { .. } | GraphEvent::DeleteProperty { .. } => 1,
            GraphEvent::AddExtendedData { .. } | GraphEvent::DeleteExtendedData { .. } => 2,
        }
    }
}

/// Orders one commit's events by class, keeping declaration order within a class.
pub(crate) fn order_commit_events(events: &mut [GraphEvent]) {
    events.sort_by_key(GraphEvent::commit_rank);
}

/// Handle returned by [`crate::Graph::add_listener`], used to unregister.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

type Listener = Arc<dyn Fn(&GraphEvent) + Send + Sync>;

/// Listeners owned by one graph instance.
///
/// Dispatch runs on the committing thread while the commit lock is held, so
/// listeners observe commits in order and must not write to the graph.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next: AtomicU64,
    listeners: RwLock<Vec<(ListenerHandle, Listener)>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&self, listener: Listener) -> ListenerHandle {
        let handle = ListenerHandle(self.next.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((handle, listener));
        handle
    }

    pub(crate) fn remove(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);
        before != listeners.len()
    }

    pub(crate) fn dispatch(&self, events: &[GraphEvent]) {
        if events.is_empty() {
            return;
        }
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for event in events {
            for listener in &snapshot {
                listener(event);
            }
        }
    }

    pub(crate) fn clear(&self) {
        self.listeners.write().clear();
    }
}
