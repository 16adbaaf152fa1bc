//! Metadata store error types.

use thiserror::Error;

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored row: {0}")]
    InvalidRow(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;
