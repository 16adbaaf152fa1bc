//! Storage services for depot.
//!
//! This crate provides:
//! - The location index (idempotent directory assignment per file name)
//! - The chunk store and per-file merge coordination
//! - The content metadata cache
//! - The transfer server tying uploads, merges and downloads together

pub mod cache;
pub mod chunks;
pub mod error;
pub mod index;
pub mod lock;
pub mod merge;
pub mod transfer;

pub use cache::MetadataCache;
pub use chunks::ChunkStore;
pub use error::{StorageError, StorageResult};
pub use index::LocationIndex;
pub use lock::{FileLockGuard, LockManager};
pub use merge::{MergeCoordinator, MergeOutcome};
pub use transfer::{DownloadStream, TransferServer, UploadReceipt};

use depot_core::VolumeRouter;
use depot_core::config::AppConfig;
use depot_metadata::MetadataStore;
use std::sync::Arc;

/// Build a transfer server from configuration and an opened metadata store.
pub fn from_config(
    config: &AppConfig,
    store: Arc<dyn MetadataStore>,
) -> StorageResult<TransferServer> {
    config
        .transfer
        .validate()
        .map_err(StorageError::Config)?;
    let router = Arc::new(VolumeRouter::new(&config.categories)?);
    Ok(TransferServer::new(router, store, &config.transfer))
}
