//! Cached file metadata repository trait.

use crate::error::MetadataResult;
use crate::models::FileInfoRow;
use async_trait::async_trait;

/// Repository for content metadata keyed by resolved path.
#[async_trait]
pub trait FileInfoRepo: Send + Sync {
    /// Get cached metadata for a path.
    async fn get_file_info(&self, path: &str) -> MetadataResult<Option<FileInfoRow>>;

    /// Insert or replace cached metadata for a path.
    async fn upsert_file_info(&self, info: &FileInfoRow) -> MetadataResult<()>;
}
