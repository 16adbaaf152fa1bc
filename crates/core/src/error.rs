//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("invalid byte range: {0}")]
    InvalidRange(String),

    #[error("invalid chunk name: {0}")]
    InvalidChunkName(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
