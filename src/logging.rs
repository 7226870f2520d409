//! Process-wide `tracing` subscriber setup.

use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{GraphError, Result};
use crate::storage::GraphConfig;

/// Filter applied when neither a directive nor `RUST_LOG` is given.
pub const DEFAULT_LOG_FILTER: &str = "penumbra=info";

/// Installs a fmt subscriber.
///
/// An explicit `directive` wins over `RUST_LOG`; with neither,
/// [`DEFAULT_LOG_FILTER`] applies. Fails if the directive does not parse or
/// a global subscriber is already installed.
pub fn init_logging(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER)),
    }
    .map_err(|e| GraphError::InvalidArgument(format!("invalid log filter: {e}")))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| GraphError::InvalidArgument("a global tracing subscriber is already installed".into()))?;
    debug!(directive = directive.unwrap_or("<env>"), "logging.init");
    Ok(())
}

/// [`init_logging`] driven by the `log_level` of a loaded [`GraphConfig`].
pub fn init_logging_from_config(config: &GraphConfig) -> Result<()> {
    init_logging(config.log_level.as_deref())
}
