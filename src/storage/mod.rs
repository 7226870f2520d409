//! Element storage: records, the backend trait and its in-memory
//! implementation, extended data, options and metrics.

mod extended;
mod memory;
mod metrics;
mod options;
pub(crate) mod record;
mod store;

pub use extended::{ExtendedDataScan, ExtendedDataStore};
pub use memory::MemoryElementStore;
pub use metrics::{default_metrics, CounterMetrics, GraphMetrics, NoopMetrics};
pub use options::{GraphConfig, GraphOptions, DEFAULT_MAX_PATH_HOPS, DEFAULT_QUERY_LIMIT};
pub use record::{
    EdgeEndpoints, EdgeRef, ElementRecord, ElementState, ElementVersion, HiddenLog, HiddenMark,
    PropertyHiddenLog, StoredProperty,
};
pub use store::ElementStore;
