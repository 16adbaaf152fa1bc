//! Application state shared across handlers.

use depot_core::config::AppConfig;
use depot_metadata::MetadataStore;
use depot_storage::TransferServer;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub metadata: Arc<dyn MetadataStore>,
    pub transfer: Arc<TransferServer>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        transfer: TransferServer,
    ) -> Self {
        Self {
            config: Arc::new(config),
            metadata,
            transfer: Arc::new(transfer),
        }
    }
}
