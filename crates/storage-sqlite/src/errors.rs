//! Storage error type and its mapping onto the core error.

use diesel::r2d2;
use thiserror::Error;

/// Result type alias for storage internals.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Diesel(#[from] diesel::result::Error),

    #[error("Connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::PoolError),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// The write actor is gone; no further writes can be made.
    #[error("Writer unavailable")]
    WriterClosed,

    /// A core error raised inside a write job.
    #[error(transparent)]
    Core(#[from] sitecache_core::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

impl From<StorageError> for sitecache_core::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Core(inner) => inner,
            other => sitecache_core::Error::storage(other.to_string()),
        }
    }
}
