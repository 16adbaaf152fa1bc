//! Location index repository trait.

use crate::error::MetadataResult;
use crate::models::LocationRow;
use async_trait::async_trait;

/// Repository for file name to directory assignments.
#[async_trait]
pub trait LocationRepo: Send + Sync {
    /// Insert a location unless one already exists for the file name.
    ///
    /// Returns `true` when this call created the record. The existing record is
    /// never modified.
    async fn insert_location_if_absent(&self, location: &LocationRow) -> MetadataResult<bool>;

    /// Get the location assigned to a file name.
    async fn get_location(&self, file_name: &str) -> MetadataResult<Option<LocationRow>>;
}
