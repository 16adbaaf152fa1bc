//! Storage error types.

use depot_metadata::MetadataError;
use std::io;
use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("upload of {file_name} failed: {source}")]
    UploadFailed {
        file_name: String,
        #[source]
        source: io::Error,
    },

    #[error("merge of {file_name} failed: {source}")]
    MergeFailed {
        file_name: String,
        #[source]
        source: io::Error,
    },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("not a regular file: {0}")]
    NotAFile(String),

    #[error("download of {file_name} failed: {source}")]
    DownloadFailed {
        file_name: String,
        #[source]
        source: io::Error,
    },

    #[error("no location recorded for {0}")]
    LocationNotFound(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Short label used for error metrics and logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            StorageError::UnknownCategory(_) => "unknown_category",
            StorageError::InvalidFileName(_) => "invalid_file_name",
            StorageError::UploadFailed { .. } => "upload_failed",
            StorageError::MergeFailed { .. } => "merge_failed",
            StorageError::FileNotFound(_) => "file_not_found",
            StorageError::NotAFile(_) => "not_a_file",
            StorageError::DownloadFailed { .. } => "download_failed",
            StorageError::LocationNotFound(_) => "location_not_found",
            StorageError::InvalidRange(_) => "invalid_range",
            StorageError::Config(_) => "config",
            StorageError::Metadata(_) => "metadata",
            StorageError::Io(_) => "io",
        }
    }
}

impl From<depot_core::Error> for StorageError {
    fn from(e: depot_core::Error) -> Self {
        match e {
            depot_core::Error::UnknownCategory(c) => StorageError::UnknownCategory(c),
            depot_core::Error::InvalidFileName(n) => StorageError::InvalidFileName(n),
            depot_core::Error::InvalidRange(r) => StorageError::InvalidRange(r),
            depot_core::Error::Config(msg) => StorageError::Config(msg),
            other => StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, other)),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
