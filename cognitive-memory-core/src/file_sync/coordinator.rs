//! Coordination layer (`SPEC_FULL.md` §4.9): consumes [`SyncEvent`]s and
//! performs the atomic delete+reload. Runs the two halves of one path's
//! update under a per-path `tokio::sync::Mutex`; a failure in the reload
//! is retried with exponential backoff before the path is marked
//! health-degraded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::loader::{LoaderRegistry, MemoryCandidate};
use super::poller::{SyncEvent, SyncEventKind};
use crate::constants::{SYNC_MAX_RETRY_ATTEMPTS, SYNC_RETRY_BASE_DELAY, SYNC_RETRY_MAX_DELAY};
use crate::error::Result;
use uuid::Uuid;

/// The subset of façade behavior the file sync coordinator needs: storing
/// a loaded candidate and deleting everything with a given `source_path`.
/// Kept as a narrow trait (rather than depending on `crate::facade`
/// directly) so the coordination layer stays testable without a full
/// `CognitiveMemory` instance.
#[async_trait]
pub trait MemorySink: Send + Sync {
    /// Store one loaded candidate, returning the id it was assigned.
    /// `source_path` and `parent_id` (remapped from the loader's
    /// in-load-only `parent_ref`) are recorded on the stored memory.
    async fn store_candidate(
        &self,
        candidate: &MemoryCandidate,
        source_path: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Uuid>;

    /// Delete every memory whose `source_path` equals `path`. Returns the
    /// count deleted.
    async fn delete_by_source(&self, path: &str) -> Result<u64>;
}

/// Whether the file sync engine is keeping up or has a path stuck in
/// retry, surfaced by the façade's `stats()` operation.
#[derive(Debug, Clone, Default)]
pub struct SyncHealth {
    /// Paths that have exhausted their retry budget and are no longer
    /// being retried automatically.
    pub degraded_paths: Vec<String>,
    /// Total events successfully processed since startup.
    pub processed: u64,
    /// Total events that failed at least once.
    pub failed: u64,
}

struct DirtyState {
    attempts: u32,
}

/// Performs the atomic delete+reload for each [`SyncEvent`], serialized
/// per path.
pub struct FileSyncCoordinator {
    sink: Arc<dyn MemorySink>,
    loaders: Arc<LoaderRegistry>,
    atomic: bool,
    path_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    dirty: Mutex<HashMap<PathBuf, DirtyState>>,
    health: Mutex<SyncHealth>,
}

impl FileSyncCoordinator {
    /// Build a coordinator over `sink` using `loaders` to realize
    /// `Added`/`Modified` events. `atomic` mirrors `SYNC_ATOMIC_OPERATIONS`:
    /// when true, a reload failure leaves the path `dirty` for retry
    /// instead of silently losing the prior content.
    #[must_use]
    pub fn new(sink: Arc<dyn MemorySink>, loaders: Arc<LoaderRegistry>, atomic: bool) -> Self {
        Self {
            sink,
            loaders,
            atomic,
            path_locks: Mutex::new(HashMap::new()),
            dirty: Mutex::new(HashMap::new()),
            health: Mutex::new(SyncHealth::default()),
        }
    }

    /// Current health snapshot.
    pub async fn health(&self) -> SyncHealth {
        self.health.lock().await.clone()
    }

    async fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.path_locks.lock().await;
        locks.entry(path.to_path_buf()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Process one event: acquire the per-path lock, delete existing
    /// memories for `Modified`/`Deleted`, then reload for `Added`/`Modified`.
    pub async fn handle_event(&self, event: SyncEvent) {
        let lock = self.lock_for(&event.path).await;
        let _guard = lock.lock().await;

        let path_str = event.path.to_string_lossy().into_owned();
        let result = self.process_locked(&event, &path_str).await;

        match result {
            Ok(()) => {
                self.dirty.lock().await.remove(&event.path);
                let mut health = self.health.lock().await;
                health.processed += 1;
                health.degraded_paths.retain(|p| p != &path_str);
            }
            Err(err) => {
                warn!(path = %path_str, ?err, "file sync event failed, scheduling retry");
                self.health.lock().await.failed += 1;
                self.retry_with_backoff(event, path_str).await;
            }
        }
    }

    async fn process_locked(&self, event: &SyncEvent, path_str: &str) -> Result<()> {
        match event.kind {
            SyncEventKind::Deleted => {
                self.sink.delete_by_source(path_str).await?;
                Ok(())
            }
            SyncEventKind::Modified => {
                self.sink.delete_by_source(path_str).await?;
                self.reload(&event.path, path_str).await
            }
            SyncEventKind::Added => self.reload(&event.path, path_str).await,
        }
    }

    async fn reload(&self, path: &Path, path_str: &str) -> Result<()> {
        let Some(loader) = self.loaders.loader_for(path) else {
            debug!(path = %path_str, "no loader registered for path, skipping");
            return Ok(());
        };
        let candidates = loader.load(path)?;

        let mut id_map: HashMap<Uuid, Uuid> = HashMap::new();
        for candidate in &candidates {
            let stored_parent = candidate.parent_ref.and_then(|p| id_map.get(&p).copied());
            let stored_id = self.sink.store_candidate(candidate, path_str, stored_parent).await?;
            if let Some(hint) = candidate.id_hint {
                id_map.insert(hint, stored_id);
            }
        }
        Ok(())
    }

    async fn retry_with_backoff(&self, event: SyncEvent, path_str: String) {
        if !self.atomic {
            return;
        }
        let attempts = {
            let mut dirty = self.dirty.lock().await;
            let state = dirty.entry(event.path.clone()).or_insert(DirtyState { attempts: 0 });
            state.attempts += 1;
            state.attempts
        };

        if attempts > SYNC_MAX_RETRY_ATTEMPTS {
            error!(path = %path_str, "file sync path exhausted retries, marking degraded");
            let mut health = self.health.lock().await;
            if !health.degraded_paths.contains(&path_str) {
                health.degraded_paths.push(path_str);
            }
            return;
        }

        let delay = std::cmp::min(
            SYNC_RETRY_BASE_DELAY.saturating_mul(2u32.saturating_pow(attempts.saturating_sub(1))),
            SYNC_RETRY_MAX_DELAY,
        );
        debug!(path = %event.path.display(), attempts, ?delay, "retrying file sync event");

        let lock = self.lock_for(&event.path).await;
        let sink = self.sink.clone();
        let loaders = self.loaders.clone();
        let atomic = self.atomic;
        let path_locks_entry = event.path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let path_str = path_locks_entry.to_string_lossy().into_owned();
            let _guard = lock.lock().await;
            let retry_coordinator = RetryHandle { sink, loaders, atomic };
            if let Err(err) = retry_coordinator.reload_only(&path_locks_entry, &path_str, &event).await {
                warn!(path = %path_str, ?err, "retry attempt failed");
            }
        });
    }
}

/// Minimal standalone helper used by the spawned retry task so it does not
/// need to borrow the owning [`FileSyncCoordinator`] across a `'static`
/// boundary.
struct RetryHandle {
    sink: Arc<dyn MemorySink>,
    loaders: Arc<LoaderRegistry>,
    atomic: bool,
}

impl RetryHandle {
    async fn reload_only(&self, path: &Path, path_str: &str, event: &SyncEvent) -> Result<()> {
        let _ = self.atomic;
        match event.kind {
            SyncEventKind::Deleted => self.sink.delete_by_source(path_str).await.map(|_| ()),
            SyncEventKind::Modified | SyncEventKind::Added => {
                if let Some(loader) = self.loaders.loader_for(path) {
                    let candidates = loader.load(path)?;
                    let mut id_map: HashMap<Uuid, Uuid> = HashMap::new();
                    for candidate in &candidates {
                        let stored_parent = candidate.parent_ref.and_then(|p| id_map.get(&p).copied());
                        let stored_id = self.sink.store_candidate(candidate, path_str, stored_parent).await?;
                        if let Some(hint) = candidate.id_hint {
                            id_map.insert(hint, stored_id);
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as SyncMutex;

    #[derive(Default)]
    struct RecordingSink {
        stored: SyncMutex<Vec<String>>,
        deleted: SyncMutex<Vec<String>>,
    }

    #[async_trait]
    impl MemorySink for RecordingSink {
        async fn store_candidate(
            &self,
            candidate: &MemoryCandidate,
            source_path: &str,
            _parent_id: Option<Uuid>,
        ) -> Result<Uuid> {
            self.stored.lock().push(format!("{source_path}:{}", candidate.text));
            Ok(Uuid::new_v4())
        }

        async fn delete_by_source(&self, path: &str) -> Result<u64> {
            self.deleted.lock().push(path.to_string());
            Ok(1)
        }
    }

    fn registry_with_markdown() -> Arc<LoaderRegistry> {
        Arc::new(LoaderRegistry::new().with_loader(Box::new(super::super::markdown::MarkdownLoader::new())))
    }

    #[tokio::test]
    async fn added_event_reloads_via_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "flat note, no sections\n").unwrap();

        let sink = Arc::new(RecordingSink::default());
        let coordinator = FileSyncCoordinator::new(sink.clone(), registry_with_markdown(), true);

        coordinator.handle_event(SyncEvent { path: path.clone(), kind: SyncEventKind::Added }).await;

        assert_eq!(sink.stored.lock().len(), 1);
        assert_eq!(sink.deleted.lock().len(), 0);
    }

    #[tokio::test]
    async fn modified_event_deletes_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "updated content\n").unwrap();

        let sink = Arc::new(RecordingSink::default());
        let coordinator = FileSyncCoordinator::new(sink.clone(), registry_with_markdown(), true);

        coordinator.handle_event(SyncEvent { path: path.clone(), kind: SyncEventKind::Modified }).await;

        assert_eq!(sink.deleted.lock().len(), 1);
        assert_eq!(sink.stored.lock().len(), 1);
    }

    #[tokio::test]
    async fn deleted_event_only_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");

        let sink = Arc::new(RecordingSink::default());
        let coordinator = FileSyncCoordinator::new(sink.clone(), registry_with_markdown(), true);

        coordinator.handle_event(SyncEvent { path: path.clone(), kind: SyncEventKind::Deleted }).await;

        assert_eq!(sink.deleted.lock().len(), 1);
        assert_eq!(sink.stored.lock().len(), 0);
    }

    #[tokio::test]
    async fn unsupported_extension_is_a_no_op_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "x").unwrap();

        let sink = Arc::new(RecordingSink::default());
        let coordinator = FileSyncCoordinator::new(sink.clone(), registry_with_markdown(), true);

        coordinator.handle_event(SyncEvent { path, kind: SyncEventKind::Added }).await;
        assert_eq!(sink.stored.lock().len(), 0);
    }

    #[test]
    fn health_defaults_to_clean() {
        let health = SyncHealth::default();
        assert!(health.degraded_paths.is_empty());
        assert_eq!(health.processed, 0);
    }
}
