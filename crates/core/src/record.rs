//! Location and file metadata records.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::OffsetDateTime;

/// Persisted mapping from a logical file name to its assigned directory.
///
/// The directory never changes once a record exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocationRecord {
    /// Logical file name (unique).
    pub file_name: String,
    /// Assigned directory (`root/xx/yy`).
    pub directory: PathBuf,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl LocationRecord {
    /// Path of the whole artifact inside the assigned directory.
    pub fn artifact_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Cached content metadata for a resolved file path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedFileInfo {
    /// Resolved file path (cache key).
    pub path: PathBuf,
    pub content_hash: ContentHash,
    pub size: u64,
    /// Filesystem modification time in milliseconds since the Unix epoch.
    pub last_modified_ms: i64,
    pub cached_at: OffsetDateTime,
}

impl CachedFileInfo {
    /// Modification time as a timestamp.
    pub fn last_modified_at(&self) -> OffsetDateTime {
        millis_to_datetime(self.last_modified_ms)
    }
}

/// Metadata returned to callers of the info query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_name: String,
    pub path: PathBuf,
    /// Lowercase hex SHA-256 of the file content.
    pub content_hash: String,
    pub size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified_at: OffsetDateTime,
    /// When the metadata entry was computed.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FileInfo {
    /// Build the caller-facing view of a cache entry.
    pub fn from_cached(file_name: impl Into<String>, cached: &CachedFileInfo) -> Self {
        Self {
            file_name: file_name.into(),
            path: cached.path.clone(),
            content_hash: cached.content_hash.to_hex(),
            size: cached.size,
            last_modified_at: cached.last_modified_at(),
            created_at: cached.cached_at,
        }
    }
}

/// Convert epoch milliseconds into a UTC timestamp, clamping out-of-range values.
pub fn millis_to_datetime(ms: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Convert a `SystemTime` (e.g. file mtime) into epoch milliseconds.
pub fn system_time_to_millis(t: std::time::SystemTime) -> i64 {
    match t.duration_since(std::time::UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_millis()).unwrap_or(i64::MAX),
    }
}
