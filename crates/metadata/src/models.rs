//! Database models mapping to the metadata schema.

use crate::error::{MetadataError, MetadataResult};
use depot_core::{CachedFileInfo, ContentHash, LocationRecord};
use sqlx::FromRow;
use std::path::PathBuf;
use time::OffsetDateTime;

// =============================================================================
// Location index
// =============================================================================

/// Assigned directory for a logical file name.
#[derive(Debug, Clone, FromRow)]
pub struct LocationRow {
    pub file_name: String,
    pub directory: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl LocationRow {
    /// Build a new row for a first-time assignment.
    pub fn new(file_name: impl Into<String>, directory: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            file_name: file_name.into(),
            directory: directory.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_record(self) -> LocationRecord {
        LocationRecord {
            file_name: self.file_name,
            directory: PathBuf::from(self.directory),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// =============================================================================
// File metadata cache
// =============================================================================

/// Cached content hash and size for a resolved path.
#[derive(Debug, Clone, FromRow)]
pub struct FileInfoRow {
    pub path: String,
    pub content_hash: String,
    pub size_bytes: i64,
    /// Filesystem mtime in epoch milliseconds.
    pub last_modified_ms: i64,
    pub cached_at: OffsetDateTime,
}

impl FileInfoRow {
    pub fn from_cached(info: &CachedFileInfo) -> Self {
        Self {
            path: info.path.to_string_lossy().into_owned(),
            content_hash: info.content_hash.to_hex(),
            size_bytes: i64::try_from(info.size).unwrap_or(i64::MAX),
            last_modified_ms: info.last_modified_ms,
            cached_at: info.cached_at,
        }
    }

    pub fn into_cached(self) -> MetadataResult<CachedFileInfo> {
        let content_hash = ContentHash::from_hex(&self.content_hash).map_err(|e| {
            MetadataError::InvalidRow(format!("file_info {}: {e}", self.path))
        })?;
        let size = u64::try_from(self.size_bytes).map_err(|_| {
            MetadataError::InvalidRow(format!(
                "file_info {}: negative size {}",
                self.path, self.size_bytes
            ))
        })?;
        Ok(CachedFileInfo {
            path: PathBuf::from(self.path),
            content_hash,
            size,
            last_modified_ms: self.last_modified_ms,
            cached_at: self.cached_at,
        })
    }
}
