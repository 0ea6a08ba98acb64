//! Error types for the worker core.

use thiserror::Error;

/// Result type alias for worker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the worker core and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The origin could not be reached (offline, DNS, connection reset, timeout).
    #[error("Network unavailable: {0}")]
    Network(String),

    /// A cache partition read or write failed.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Durable storage (pending actions, counters) failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Install could not pre-populate every listed URL.
    #[error("Install failed: {0}")]
    Install(String),

    /// A sync event arrived with a tag no drainer understands.
    #[error("Unknown sync tag: {0}")]
    UnknownSyncTag(String),

    /// Request could not be interpreted (bad URL, missing identifiers).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// True when the failure means "the origin was unreachable", which is the
    /// only failure the fallback strategies recover from.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidRequest(format!("Invalid URL: {}", err))
    }
}
