//! Content metadata cache invalidated by filesystem modification time.

use crate::error::{StorageError, StorageResult};
use depot_core::record::system_time_to_millis;
use depot_core::{CachedFileInfo, ContentHash};
use depot_metadata::MetadataStore;
use depot_metadata::models::FileInfoRow;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument};

pub struct MetadataCache {
    store: Arc<dyn MetadataStore>,
    buffer_size: usize,
    hash_computations: AtomicU64,
}

impl MetadataCache {
    pub fn new(store: Arc<dyn MetadataStore>, buffer_size: usize) -> Self {
        Self {
            store,
            buffer_size: buffer_size.max(1),
            hash_computations: AtomicU64::new(0),
        }
    }

    /// Number of full-content hashes computed so far.
    pub fn hash_computations(&self) -> u64 {
        self.hash_computations.load(Ordering::Relaxed)
    }

    /// Metadata for a file, recomputed when its mtime is newer than the cached one.
    ///
    /// Returns `None` if the file does not exist.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn get_info(&self, path: &Path) -> StorageResult<Option<CachedFileInfo>> {
        let meta = match fs::metadata(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        if !meta.is_file() {
            return Err(StorageError::NotAFile(path.display().to_string()));
        }
        let mtime_ms = system_time_to_millis(meta.modified()?);
        let key = path.to_string_lossy();

        if let Some(row) = self.store.get_file_info(&key).await? {
            let cached = row.into_cached()?;
            if cached.last_modified_ms >= mtime_ms {
                debug!("metadata cache hit");
                return Ok(Some(cached));
            }
            debug!(
                cached_ms = cached.last_modified_ms,
                mtime_ms, "metadata cache stale"
            );
        }

        let (content_hash, size) = self.hash_file(path).await?;
        let info = CachedFileInfo {
            path: path.to_path_buf(),
            content_hash,
            size,
            last_modified_ms: mtime_ms,
            cached_at: OffsetDateTime::now_utc(),
        };
        self.store
            .upsert_file_info(&FileInfoRow::from_cached(&info))
            .await?;
        Ok(Some(info))
    }

    async fn hash_file(&self, path: &Path) -> StorageResult<(ContentHash, u64)> {
        self.hash_computations.fetch_add(1, Ordering::Relaxed);

        let mut file = fs::File::open(path).await?;
        let mut hasher = ContentHash::hasher();
        let mut buf = vec![0u8; self.buffer_size];
        let mut size = 0u64;
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size += n as u64;
        }
        Ok((hasher.finalize(), size))
    }
}
