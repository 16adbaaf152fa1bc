//! Chunk store: per-file temporary directories holding arrived chunks.

use crate::error::{StorageError, StorageResult};
use depot_core::{ChunkId, FileNameHash};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Prefix of in-flight temporary files; never counted as chunks.
pub(crate) const TEMP_PREFIX: &str = depot_core::TEMP_FILE_PREFIX;

/// Naming and enumeration of chunk files.
#[derive(Clone, Debug)]
pub struct ChunkStore {
    suffix: String,
}

impl ChunkStore {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// Marker between file name and ordinal.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Chunk directory of `file_name` inside its assigned directory.
    pub fn chunk_dir(&self, directory: &Path, file_name: &str) -> PathBuf {
        directory.join(FileNameHash::of(file_name).as_str())
    }

    /// Deterministic path of one chunk.
    pub fn chunk_path(&self, directory: &Path, chunk: &ChunkId) -> PathBuf {
        self.chunk_dir(directory, &chunk.file_name)
            .join(chunk.entry_name(&self.suffix))
    }

    /// Regular files in a chunk directory. A missing directory has no chunks.
    pub async fn list_chunks(&self, chunk_dir: &Path) -> StorageResult<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(chunk_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut chunks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if !file_type.is_file() {
                continue;
            }
            if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                continue;
            }
            chunks.push(entry.path());
        }
        Ok(chunks)
    }

    /// Number of chunk files currently present.
    pub async fn count(&self, chunk_dir: &Path) -> StorageResult<usize> {
        Ok(self.list_chunks(chunk_dir).await?.len())
    }

    /// Chunks of `file_name` sorted by ordinal.
    ///
    /// Fails if the directory holds an entry that is not a chunk of this file.
    pub async fn ordered_chunks(
        &self,
        chunk_dir: &Path,
        file_name: &str,
    ) -> StorageResult<Vec<(ChunkId, PathBuf)>> {
        let mut chunks = Vec::new();
        for path in self.list_chunks(chunk_dir).await? {
            let entry_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let id = ChunkId::parse_entry(file_name, &self.suffix, &entry_name).map_err(|e| {
                StorageError::MergeFailed {
                    file_name: file_name.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                }
            })?;
            chunks.push((id, path));
        }
        chunks.sort_by_key(|(id, _)| id.ordinal);
        Ok(chunks)
    }

    /// Remove a chunk directory. Failures are logged, never returned.
    pub async fn cleanup(&self, chunk_dir: &Path) {
        match fs::remove_dir_all(chunk_dir).await {
            Ok(()) => debug!(dir = %chunk_dir.display(), "removed chunk directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                dir = %chunk_dir.display(),
                error = %e,
                "failed to remove chunk directory"
            ),
        }
    }
}
