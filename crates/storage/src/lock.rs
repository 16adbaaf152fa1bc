//! Per-file advisory locks with reference-counted registry entries.

use dashmap::DashMap;
use depot_core::FileNameHash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// Registry of per-file locks keyed by file name hash.
///
/// An entry exists only while some caller holds or waits for its lock. Clones
/// share the same table, and guards own a handle to it, so a guard can move
/// into a spawned task.
#[derive(Clone, Default)]
pub struct LockManager {
    locks: Arc<LockTable>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &FileNameHash) -> FileLockGuard {
        let lock = self
            .locks
            .entry(key.as_str().to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        FileLockGuard {
            locks: self.locks.clone(),
            key: key.as_str().to_string(),
            guard: Some(guard),
        }
    }

    /// Take the lock for `key` only if nobody holds it right now.
    pub fn try_acquire(&self, key: &FileNameHash) -> Option<FileLockGuard> {
        let lock = self
            .locks
            .entry(key.as_str().to_string())
            .or_default()
            .clone();
        let guard = lock.try_lock_owned().ok();
        let held = FileLockGuard {
            locks: self.locks.clone(),
            key: key.as_str().to_string(),
            guard,
        };
        // A guard without a lock still prunes the entry on drop.
        held.guard.is_some().then_some(held)
    }

    /// Number of live registry entries.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held lock; releasing it removes the registry entry when no one else needs it.
pub struct FileLockGuard {
    locks: Arc<LockTable>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        // The guard owns a clone of the Arc; drop it before checking the count.
        drop(self.guard.take());
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let manager = LockManager::new();
        let key = FileNameHash::of("a.bin");
        {
            let _guard = manager.acquire(&key).await;
            assert_eq!(manager.len(), 1);
        }
        assert!(manager.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_is_exclusive() {
        let manager = Arc::new(LockManager::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            let active = active.clone();
            let max_active = max_active.clone();
            handles.push(tokio::spawn(async move {
                let key = FileNameHash::of("shared.bin");
                let _guard = manager.acquire(&key).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_try_acquire_fails_while_held() {
        let manager = LockManager::new();
        let key = FileNameHash::of("a.bin");
        let held = manager.acquire(&key).await;
        assert!(manager.try_acquire(&key).is_none());
        drop(held);
        assert!(manager.is_empty());

        let again = manager.try_acquire(&key);
        assert!(again.is_some());
        drop(again);
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_guard_outlives_dropped_manager_handle() {
        let manager = LockManager::new();
        let key = FileNameHash::of("a.bin");
        let handle = manager.clone();
        let guard = tokio::spawn(async move { handle.acquire(&FileNameHash::of("a.bin")).await })
            .await
            .unwrap();

        assert!(manager.try_acquire(&key).is_none());
        drop(guard);
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let manager = LockManager::new();
        let _a = manager.acquire(&FileNameHash::of("a.bin")).await;
        let _b = tokio::time::timeout(
            Duration::from_secs(1),
            manager.acquire(&FileNameHash::of("b.bin")),
        )
        .await
        .expect("distinct key should not wait");
        assert_eq!(manager.len(), 2);
    }
}
