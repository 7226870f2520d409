use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::memory::MemoryElementStore;
use super::metrics::GraphMetrics;
use super::store::ElementStore;
use crate::error::Result;
use crate::search::SearchIndex;

/// Default page size for queries that do not set a limit.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Default hard cap on path-finding depth.
pub const DEFAULT_MAX_PATH_HOPS: usize = 16;

/// Configuration options supplied when opening a [`crate::Graph`].
#[derive(Clone)]
pub struct GraphOptions {
    /// The element store backend to use
    pub store: Arc<dyn ElementStore>,
    /// Optional search index collaborator; `None` disables indexing
    pub search_index: Option<Arc<dyn SearchIndex>>,
    /// Optional metrics collection implementation
    pub metrics: Option<Arc<dyn GraphMetrics>>,
    /// Whether every visibility written must be readable by the writer.
    pub strict_write_visibility: bool,
    /// Labels callers may present; `None` accepts any well-formed label.
    pub granted_authorizations: Option<BTreeSet<String>>,
    /// Page size applied to queries without an explicit limit.
    pub default_query_limit: usize,
    /// Upper bound on `max_hops` for path finding.
    pub max_path_hops: usize,
}

impl GraphOptions {
    /// Creates options with default settings over `store`.
    pub fn new(store: Arc<dyn ElementStore>) -> Self {
        Self {
            store,
            search_index: None,
            metrics: None,
            strict_write_visibility: true,
            granted_authorizations: None,
            default_query_limit: DEFAULT_QUERY_LIMIT,
            max_path_hops: DEFAULT_MAX_PATH_HOPS,
        }
    }

    /// Options over a fresh [`MemoryElementStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryElementStore::new()))
    }

    /// Sets the search index collaborator.
    pub fn search_index(mut self, index: Arc<dyn SearchIndex>) -> Self {
        self.search_index = Some(index);
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn GraphMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Enables or disables the writer-readability check on written visibilities.
    pub fn strict_write_visibility(mut self, enabled: bool) -> Self {
        self.strict_write_visibility = enabled;
        self
    }

    /// Restricts the labels callers may present.
    pub fn granted_authorizations<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.granted_authorizations = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the default query page size.
    pub fn default_query_limit(mut self, limit: usize) -> Self {
        self.default_query_limit = limit;
        self
    }

    /// Sets the path-finding depth cap.
    pub fn max_path_hops(mut self, hops: usize) -> Self {
        self.max_path_hops = hops;
        self
    }

    /// Applies the scalar settings of a loaded [`GraphConfig`].
    pub fn with_config(mut self, config: &GraphConfig) -> Self {
        if let Some(strict) = config.strict_write_visibility {
            self.strict_write_visibility = strict;
        }
        if let Some(labels) = &config.granted_authorizations {
            self.granted_authorizations = Some(labels.iter().cloned().collect());
        }
        if let Some(limit) = config.default_query_limit {
            self.default_query_limit = limit;
        }
        if let Some(hops) = config.max_path_hops {
            self.max_path_hops = hops;
        }
        self
    }
}

/// File form of the scalar [`GraphOptions`], read from TOML.
///
/// ```toml
/// strict_write_visibility = true
/// granted_authorizations = ["a", "b"]
/// default_query_limit = 50
/// max_path_hops = 8
/// log_level = "penumbra=debug"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphConfig {
    /// See [`GraphOptions::strict_write_visibility`].
    pub strict_write_visibility: Option<bool>,
    /// See [`GraphOptions::granted_authorizations`].
    pub granted_authorizations: Option<Vec<String>>,
    /// See [`GraphOptions::default_query_limit`].
    pub default_query_limit: Option<usize>,
    /// See [`GraphOptions::max_path_hops`].
    pub max_path_hops: Option<usize>,
    /// Filter directive for [`crate::init_logging`].
    pub log_level: Option<String>,
}

impl GraphConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
