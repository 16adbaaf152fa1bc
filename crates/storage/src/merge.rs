//! Merge coordination: reassemble a file's chunks into the final artifact.

use crate::chunks::ChunkStore;
use crate::error::{StorageError, StorageResult};
use crate::lock::LockManager;
use depot_core::{ChunkId, FileNameHash};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{Instrument, debug, error, info, instrument};

/// Result of a merge trigger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// All declared chunks were concatenated into `path`.
    Merged { path: PathBuf, size: u64, chunks: usize },
    /// The observed chunk count did not match the declared count.
    Incomplete { declared: i32, observed: usize },
}

/// Serializes merges per logical file and performs the byte copy.
pub struct MergeCoordinator {
    chunks: ChunkStore,
    locks: LockManager,
}

impl MergeCoordinator {
    pub fn new(chunks: ChunkStore) -> Self {
        Self {
            chunks,
            locks: LockManager::new(),
        }
    }

    /// Lock registry, exposed for inspection.
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Merge the chunks of `file_name` stored under `directory`.
    ///
    /// The chunk directory is removed on every exit path. Once the chunk set is
    /// seen complete, the locked section runs on its own task: dropping the
    /// returned future does not cancel a merge in progress.
    #[instrument(skip(self, directory), fields(file_name = %file_name, declared = declared))]
    pub async fn merge(
        &self,
        directory: &Path,
        file_name: &str,
        declared: i32,
    ) -> StorageResult<MergeOutcome> {
        let key = FileNameHash::of(file_name);
        let chunk_dir = self.chunks.chunk_dir(directory, file_name);

        let observed = match self.chunks.count(&chunk_dir).await {
            Ok(n) => n,
            Err(e) => {
                self.chunks.cleanup(&chunk_dir).await;
                return Err(e);
            }
        };
        if !is_complete(declared, observed) {
            debug!(observed, "chunk set incomplete before lock");
            // A running merge owns the directory and cleans it up itself.
            if let Some(_guard) = self.locks.try_acquire(&key) {
                self.chunks.cleanup(&chunk_dir).await;
            }
            return Ok(MergeOutcome::Incomplete { declared, observed });
        }

        let job = LockedMerge {
            chunks: self.chunks.clone(),
            directory: directory.to_path_buf(),
            chunk_dir,
            file_name: file_name.to_string(),
            declared,
        };
        let locks = self.locks.clone();
        let task = tokio::spawn(
            async move {
                let guard = locks.acquire(&key).await;
                let result = job.run().await;
                job.chunks.cleanup(&job.chunk_dir).await;
                drop(guard);
                result
            }
            .in_current_span(),
        );

        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(StorageError::MergeFailed {
                file_name: file_name.to_string(),
                source: io::Error::other(format!("merge task failed: {e}")),
            }),
        };
        if let Err(e) = &result {
            error!(error = %e, "merge failed");
        }
        result
    }
}

/// Owned state of one merge, run while holding the file's lock.
struct LockedMerge {
    chunks: ChunkStore,
    directory: PathBuf,
    chunk_dir: PathBuf,
    file_name: String,
    declared: i32,
}

impl LockedMerge {
    async fn run(&self) -> StorageResult<MergeOutcome> {
        let ordered = self
            .chunks
            .ordered_chunks(&self.chunk_dir, &self.file_name)
            .await?;
        if !is_complete(self.declared, ordered.len()) {
            debug!(observed = ordered.len(), "chunk set changed while waiting for lock");
            return Ok(MergeOutcome::Incomplete {
                declared: self.declared,
                observed: ordered.len(),
            });
        }

        let started = Instant::now();
        let target = self.directory.join(&self.file_name);
        let count = ordered.len();
        let copy_target = target.clone();
        let merge_failed = |source: io::Error| StorageError::MergeFailed {
            file_name: self.file_name.clone(),
            source,
        };

        let size = tokio::task::spawn_blocking(move || concatenate(&copy_target, &ordered))
            .await
            .map_err(|e| merge_failed(io::Error::other(format!("spawn_blocking failed: {e}"))))?
            .map_err(merge_failed)?;

        info!(
            size,
            chunks = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "merged chunks"
        );
        Ok(MergeOutcome::Merged {
            path: target,
            size,
            chunks: count,
        })
    }
}

fn is_complete(declared: i32, observed: usize) -> bool {
    declared > 0 && usize::try_from(declared).is_ok_and(|d| d == observed)
}

/// Replace `target` with the ordered concatenation of `chunks`.
///
/// Each chunk is deleted as soon as it has been appended. A partial target is
/// removed on failure.
fn concatenate(target: &Path, chunks: &[(ChunkId, PathBuf)]) -> io::Result<u64> {
    match std::fs::remove_file(target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let result = (|| -> io::Result<u64> {
        let mut out = std::fs::File::create(target)?;
        let mut total = 0u64;
        for (_, path) in chunks {
            let mut input = std::fs::File::open(path)?;
            // std::io::copy uses copy_file_range/sendfile where the platform allows.
            total += io::copy(&mut input, &mut out)?;
            drop(input);
            std::fs::remove_file(path)?;
        }
        out.sync_all()?;
        Ok(total)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(target);
    }
    result
}
