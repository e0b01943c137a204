use thiserror::Error;

/// Errors from thumbnail cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),

    #[error("backend error: {0}")]
    Backend(String),
}
