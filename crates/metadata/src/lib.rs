//! Metadata store abstraction and implementations for depot.
//!
//! This crate persists two tables:
//! - The location index (file name to assigned directory, insert-once)
//! - The content metadata cache (path to hash, size and mtime)

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use store::{MetadataStore, SqliteStore};

use depot_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
