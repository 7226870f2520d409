use std::io;
use thiserror::Error;

use crate::model::ElementKind;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors surfaced by the graph engine.
///
/// Validation and security failures are never recovered locally; they carry the
/// offending name, id or expression so callers can diagnose them directly.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A visibility expression failed to parse.
    #[error("invalid visibility expression '{expression}': {reason}")]
    InvalidVisibility {
        /// Source text of the expression.
        expression: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// Authorizations were malformed, not granted, or cannot satisfy a written visibility.
    #[error("security violation: {0}")]
    Security(String),
    /// Data was accessed that the fetch hints used for the read did not request.
    #[error("fetch hints do not include {0}")]
    FetchHintViolation(&'static str),
    /// A property was written with a null value.
    #[error("property '{name}' cannot have a null value")]
    NullPropertyValue {
        /// Name of the offending property.
        name: String,
    },
    /// Generic argument validation failure.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The referenced element does not exist (or is deleted).
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Kind of the missing element.
        kind: ElementKind,
        /// Id of the missing element.
        id: String,
    },
    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    /// I/O failure while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Internal state was found inconsistent.
    #[error("corruption detected: {0}")]
    Corruption(String),
    /// The graph was shut down.
    #[error("graph has been shut down")]
    ShutDown,
}

impl GraphError {
    pub(crate) fn not_found(kind: ElementKind, id: impl Into<String>) -> Self {
        GraphError::NotFound {
            kind,
            id: id.into(),
        }
    }
}
