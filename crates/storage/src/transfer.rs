//! Transfer server: uploads, chunked uploads, merges and streaming downloads.

use crate::cache::MetadataCache;
use crate::chunks::{ChunkStore, TEMP_PREFIX};
use crate::error::{StorageError, StorageResult};
use crate::index::LocationIndex;
use crate::merge::{MergeCoordinator, MergeOutcome};
use bytes::Bytes;
use depot_core::config::TransferConfig;
use depot_core::descriptor::validate_file_name;
use depot_core::{DownloadDescriptor, FileInfo, UploadDescriptor, VolumeRouter};
use depot_metadata::MetadataStore;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Stored result of an upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Final path of the whole file or chunk.
    pub path: PathBuf,
    pub bytes_written: u64,
    /// Whether this was a single chunk of a chunked upload.
    pub chunked: bool,
}

/// A validated download, ready to be streamed.
pub struct DownloadStream {
    pub file_name: String,
    pub path: PathBuf,
    /// Number of bytes the stream will yield.
    pub content_length: u64,
    pub stream: BoxStream<'static, io::Result<Bytes>>,
}

impl std::fmt::Debug for DownloadStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadStream")
            .field("file_name", &self.file_name)
            .field("path", &self.path)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Entry point for all byte-moving operations.
pub struct TransferServer {
    index: LocationIndex,
    chunks: ChunkStore,
    merger: MergeCoordinator,
    cache: MetadataCache,
    buffer_size: usize,
}

impl TransferServer {
    pub fn new(
        router: Arc<VolumeRouter>,
        store: Arc<dyn MetadataStore>,
        config: &TransferConfig,
    ) -> Self {
        let buffer_size = config.buffer_size.max(1);
        let chunks = ChunkStore::new(config.chunk_suffix.clone());
        Self {
            index: LocationIndex::new(router, store.clone()),
            merger: MergeCoordinator::new(chunks.clone()),
            chunks,
            cache: MetadataCache::new(store, buffer_size),
            buffer_size,
        }
    }

    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    pub fn chunks(&self) -> &ChunkStore {
        &self.chunks
    }

    pub fn merger(&self) -> &MergeCoordinator {
        &self.merger
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Store a whole file or one chunk from `source`.
    #[instrument(skip(self, desc, source), fields(category = %desc.category, file_name = %desc.file_name))]
    pub async fn upload<S>(&self, desc: &UploadDescriptor, source: S) -> StorageResult<UploadReceipt>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        let started = Instant::now();
        let record = self.index.assign(&desc.file_name, &desc.category).await?;

        let (target, chunked) = match desc.chunk_id() {
            Some(chunk) => (self.chunks.chunk_path(&record.directory, &chunk), true),
            None => (record.artifact_path(), false),
        };

        let bytes_written = write_atomic(&target, source, self.buffer_size)
            .await
            .map_err(|source| StorageError::UploadFailed {
                file_name: desc.file_name.clone(),
                source,
            })?;

        info!(
            bytes = bytes_written,
            chunked,
            ordinal = desc.ordinal,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upload stored"
        );
        Ok(UploadReceipt {
            path: target,
            bytes_written,
            chunked,
        })
    }

    /// Merge the chunks of a chunked upload once all declared chunks are present.
    #[instrument(skip(self), fields(category = %category, file_name = %file_name))]
    pub async fn merge(
        &self,
        category: &str,
        file_name: &str,
        declared: i32,
    ) -> StorageResult<MergeOutcome> {
        let record = self.index.assign(file_name, category).await?;
        self.merger
            .merge(&record.directory, file_name, declared)
            .await
    }

    /// Directory that downloads, size and info queries read from.
    ///
    /// Indexed categories go through the location index (`None` when the file
    /// was never assigned); all others use the category's first volume.
    async fn resolve_read_dir(&self, desc: &DownloadDescriptor) -> StorageResult<Option<PathBuf>> {
        validate_file_name(&desc.file_name)?;
        let router = self.index.router();
        if router.is_indexed(&desc.category) {
            return match self.index.lookup(&desc.file_name).await {
                Ok(record) => Ok(Some(record.directory)),
                Err(StorageError::LocationNotFound(_)) => Ok(None),
                Err(e) => Err(e),
            };
        }
        Ok(Some(router.primary_root(&desc.category)?.to_path_buf()))
    }

    /// Validate a download and return a lazily read byte stream.
    #[instrument(skip(self, desc), fields(category = %desc.category, file_name = %desc.file_name))]
    pub async fn open_download(&self, desc: &DownloadDescriptor) -> StorageResult<DownloadStream> {
        let dir = self
            .resolve_read_dir(desc)
            .await?
            .ok_or_else(|| StorageError::FileNotFound(desc.file_name.clone()))?;
        let path = dir.join(&desc.file_name);

        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::FileNotFound(desc.file_name.clone()));
            }
            Err(e) => return Err(StorageError::Io(e)),
        };
        if !meta.is_file() {
            return Err(StorageError::NotAFile(desc.file_name.clone()));
        }

        let len = meta.len();
        let (start, limit) = match desc.range {
            Some(range) => (range.start, range.length),
            None => (0, None),
        };
        let available = len.saturating_sub(start);
        let content_length = limit.map_or(available, |l| l.min(available));

        let mut file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                StorageError::FileNotFound(desc.file_name.clone())
            } else {
                StorageError::Io(e)
            }
        })?;
        if start > 0 {
            file.seek(io::SeekFrom::Start(start)).await?;
        }

        debug!(start, content_length, "opening download");
        let buffer_size = self.buffer_size;
        let stream = async_stream::try_stream! {
            let mut file = file;
            let mut remaining = content_length;
            let mut buf = vec![0u8; buffer_size];
            while remaining > 0 {
                let want = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
                let n = file.read(&mut buf[..want]).await?;
                if n == 0 {
                    break;
                }
                remaining -= n as u64;
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(DownloadStream {
            file_name: desc.file_name.clone(),
            path,
            content_length,
            stream: Box::pin(stream),
        })
    }

    /// Stream a download into `sink`, flushing after every buffer.
    ///
    /// Bytes already written cannot be recalled; any error means the download failed.
    pub async fn download<W>(&self, desc: &DownloadDescriptor, sink: &mut W) -> StorageResult<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let started = Instant::now();
        let mut download = self.open_download(desc).await?;
        let failed = |source: io::Error| StorageError::DownloadFailed {
            file_name: desc.file_name.clone(),
            source,
        };

        let mut sent = 0u64;
        while let Some(chunk) = download.stream.next().await {
            let chunk = chunk.map_err(failed)?;
            sink.write_all(&chunk).await.map_err(failed)?;
            sink.flush().await.map_err(failed)?;
            sent += chunk.len() as u64;
        }

        info!(
            file_name = %desc.file_name,
            bytes = sent,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "download complete"
        );
        Ok(sent)
    }

    /// Size of the target file, or 0 when it does not exist.
    #[instrument(skip(self, desc), fields(category = %desc.category, file_name = %desc.file_name))]
    pub async fn file_size(&self, desc: &DownloadDescriptor) -> StorageResult<u64> {
        let Some(dir) = self.resolve_read_dir(desc).await? else {
            return Ok(0);
        };
        match fs::metadata(dir.join(&desc.file_name)).await {
            Ok(meta) if meta.is_file() => Ok(meta.len()),
            Ok(_) => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Cached content metadata of the target file, or `None` when it does not exist.
    #[instrument(skip(self, desc), fields(category = %desc.category, file_name = %desc.file_name))]
    pub async fn file_info(&self, desc: &DownloadDescriptor) -> StorageResult<Option<FileInfo>> {
        let Some(dir) = self.resolve_read_dir(desc).await? else {
            return Ok(None);
        };
        let path = dir.join(&desc.file_name);
        let info = self.cache.get_info(&path).await?;
        Ok(info.map(|cached| FileInfo::from_cached(desc.file_name.clone(), &cached)))
    }
}

/// Write `source` to a temporary sibling of `target`, fsync, then rename.
async fn write_atomic<S>(target: &Path, source: S, buffer_size: usize) -> io::Result<u64>
where
    S: Stream<Item = io::Result<Bytes>> + Send,
{
    let parent = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no parent"))?;
    fs::create_dir_all(parent).await?;

    let temp_path = parent.join(format!("{TEMP_PREFIX}{}", Uuid::new_v4()));
    let result = async {
        let file = fs::File::create(&temp_path).await?;
        let mut writer = tokio::io::BufWriter::with_capacity(buffer_size, file);
        let mut source = std::pin::pin!(source);
        let mut written = 0u64;
        while let Some(chunk) = source.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        writer.get_ref().sync_all().await?;
        drop(writer);
        fs::rename(&temp_path, target).await?;
        Ok::<_, io::Error>(written)
    }
    .await;

    if result.is_err()
        && let Err(e) = fs::remove_file(&temp_path).await
        && e.kind() != io::ErrorKind::NotFound
    {
        warn!(path = %temp_path.display(), error = %e, "failed to remove temporary upload");
    }
    result
}
