pub mod fixtures;

use bytes::Bytes;
use depot_core::config::AppConfig;
use depot_core::{DownloadDescriptor, UploadDescriptor};
use depot_metadata::{MetadataStore, SqliteStore};
use depot_storage::{TransferServer, from_config};
use futures::Stream;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

#[allow(unused_imports)]
pub use fixtures::{concat, seeded_bytes, split_stream};

/// Transfer server over temporary volumes and a temporary SQLite database.
pub struct TestDepot {
    pub dir: TempDir,
    pub config: AppConfig,
    pub store: Arc<dyn MetadataStore>,
    pub server: Arc<TransferServer>,
}

impl TestDepot {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::for_testing(dir.path());
        tweak(&mut config);

        let store: Arc<dyn MetadataStore> =
            Arc::new(SqliteStore::new(dir.path().join("metadata.db")).await.unwrap());
        let server = Arc::new(from_config(&config, store.clone()).unwrap());
        Self {
            dir,
            config,
            store,
            server,
        }
    }

    /// Upload a whole file in `piece`-sized stream items.
    #[allow(dead_code)]
    pub async fn put_whole(&self, category: &str, file_name: &str, data: &Bytes) {
        self.server
            .upload(
                &UploadDescriptor::whole(category, file_name),
                split_stream(data.clone(), 4096),
            )
            .await
            .unwrap();
    }

    /// Upload one chunk of a chunked upload.
    #[allow(dead_code)]
    pub async fn put_chunk(
        &self,
        category: &str,
        file_name: &str,
        total: i32,
        ordinal: u32,
        data: &Bytes,
    ) {
        self.server
            .upload(
                &UploadDescriptor::chunk(category, file_name, total, ordinal),
                split_stream(data.clone(), 1000),
            )
            .await
            .unwrap();
    }

    /// Download a whole file into memory.
    #[allow(dead_code)]
    pub async fn get(&self, category: &str, file_name: &str) -> Vec<u8> {
        let mut out = Vec::new();
        self.server
            .download(&DownloadDescriptor::new(category, file_name), &mut out)
            .await
            .unwrap();
        out
    }

    /// Directory assigned to `file_name` in the location index.
    #[allow(dead_code)]
    pub async fn assigned_dir(&self, file_name: &str) -> PathBuf {
        self.server.index().lookup(file_name).await.unwrap().directory
    }
}

/// A source stream that yields `data` and then fails.
#[allow(dead_code)]
pub fn failing_stream(data: Bytes) -> impl Stream<Item = io::Result<Bytes>> + Send {
    futures::stream::iter(vec![
        Ok(data),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
    ])
}
