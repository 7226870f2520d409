//! Penumbra: a property graph with cell-level visibility.
//!
//! Every property and element carries a [`Visibility`] expression evaluated
//! against the caller's [`Authorizations`] on each read. Elements keep their
//! full property history, can be soft-deleted and read back as of an earlier
//! timestamp, can be hidden per visibility, and own sparse extended-data
//! tables. A pluggable [`SearchIndex`] receives every committed change.
//!
//! ```
//! use penumbra::{Authorizations, FetchHints, Graph, GraphElement, Visibility};
//!
//! let graph = Graph::in_memory().unwrap();
//! let auths = Authorizations::new(["a"]);
//! let vis = Visibility::new("a").unwrap();
//! graph
//!     .prepare_vertex(Some("v1"), None, &vis, "person")
//!     .set_property("name", "joe", &vis)
//!     .save(&auths)
//!     .unwrap();
//! let v1 = graph.get_vertex("v1", &FetchHints::ALL, &auths).unwrap().unwrap();
//! let name = v1.property_value("name").unwrap().and_then(|v| v.as_str());
//! assert_eq!(name, Some("joe"));
//! ```

#![forbid(unsafe_code)]

mod clock;
pub mod error;
pub mod events;
pub mod graph;
pub mod logging;
pub mod model;
pub mod mutation;
pub mod search;
pub mod security;
pub mod storage;

pub use error::{GraphError, Result};
pub use events::{GraphEvent, ListenerHandle};
pub use graph::{FindPathOptions, Graph};
pub use logging::{init_logging, init_logging_from_config};
pub use model::{
    Direction, Edge, EdgeInfo, ElementId, ElementKind, ExtendedDataCell, ExtendedDataRow,
    ExtendedDataRowId, FetchHints, FetchHintsBuilder, GraphElement, HistoricalPropertyValue,
    HistoryFilter, IdRange, Metadata, MetadataEntry, Path, PropValue, Property, PropertyKey,
    RelatedEdge, Vertex, DEFAULT_KEY,
};
pub use mutation::{EdgeMutation, ElementMutation, IndexHint, MutationPlan, VertexMutation};
pub use search::{
    GraphQuery, HasFilter, IndexDocument, IndexedProperty, MemorySearchIndex, NoopSearchIndex,
    QueryResults, SearchHit, SearchHits, SearchIndex, SearchRequest, SearchTarget,
};
pub use security::{Authorizations, Visibility};
pub use storage::{
    CounterMetrics, ElementStore, ExtendedDataScan, GraphConfig, GraphMetrics, GraphOptions,
    MemoryElementStore, NoopMetrics,
};
