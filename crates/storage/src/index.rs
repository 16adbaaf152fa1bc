//! Location index: assigns each logical file a directory exactly once.

use crate::error::{StorageError, StorageResult};
use depot_core::descriptor::validate_file_name;
use depot_core::{FileNameHash, LocationRecord, VolumeRouter};
use depot_metadata::MetadataStore;
use depot_metadata::models::LocationRow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Persistent mapping from file name to assigned directory.
pub struct LocationIndex {
    router: Arc<VolumeRouter>,
    store: Arc<dyn MetadataStore>,
}

impl LocationIndex {
    pub fn new(router: Arc<VolumeRouter>, store: Arc<dyn MetadataStore>) -> Self {
        Self { router, store }
    }

    /// The category table used for new assignments.
    pub fn router(&self) -> &VolumeRouter {
        &self.router
    }

    /// Return the directory assigned to `file_name`, assigning one on first use.
    ///
    /// Concurrent first-time callers converge on a single persisted record: the
    /// store's insert-if-absent decides the winner and losers reread it.
    #[instrument(skip(self), fields(file_name = %file_name, category = %category))]
    pub async fn assign(&self, file_name: &str, category: &str) -> StorageResult<LocationRecord> {
        validate_file_name(file_name)?;
        let root = self.router.resolve_root(category)?;

        if let Some(existing) = self.store.get_location(file_name).await? {
            return Ok(existing.into_record());
        }

        let directory = shard_directory(root, file_name);
        // Racers create the same or a sibling shard; both are fine.
        fs::create_dir_all(&directory).await?;

        let row = LocationRow::new(file_name, directory.to_string_lossy());
        if self.store.insert_location_if_absent(&row).await? {
            info!(directory = %directory.display(), "assigned location");
            return Ok(row.into_record());
        }

        debug!("lost first-assignment race, rereading location");
        self.store
            .get_location(file_name)
            .await?
            .map(LocationRow::into_record)
            .ok_or_else(|| StorageError::LocationNotFound(file_name.to_string()))
    }

    /// Read the assigned location without creating one.
    #[instrument(skip(self), fields(file_name = %file_name))]
    pub async fn lookup(&self, file_name: &str) -> StorageResult<LocationRecord> {
        validate_file_name(file_name)?;
        self.store
            .get_location(file_name)
            .await?
            .map(LocationRow::into_record)
            .ok_or_else(|| StorageError::LocationNotFound(file_name.to_string()))
    }
}

/// `root/xx/yy` where `xxyy` are the first hex characters of the file name hash.
pub fn shard_directory(root: &Path, file_name: &str) -> PathBuf {
    let hash = FileNameHash::of(file_name);
    let (first, second) = hash.shard_dirs();
    root.join(first).join(second)
}
