//! Error types for the origin client.

use thiserror::Error;

/// Result type alias for origin operations.
pub type Result<T> = std::result::Result<T, OriginError>;

#[derive(Debug, Error)]
pub enum OriginError {
    /// Transport failure: connect, timeout, reset, body read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request could not be turned into an HTTP call (bad URL, header, method).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl OriginError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

impl From<OriginError> for sitecache_core::Error {
    fn from(err: OriginError) -> Self {
        match err {
            OriginError::Http(e) => sitecache_core::Error::network(e.to_string()),
            OriginError::InvalidRequest(message) => sitecache_core::Error::invalid_request(message),
        }
    }
}
