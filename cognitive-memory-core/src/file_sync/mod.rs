//! File-change synchronization (`SPEC_FULL.md` §4.9): a polling detection
//! layer feeds change events over an `mpsc` channel to a bounded worker
//! pool that performs the atomic delete+reload, matching §9's preference
//! for message-passing over a shared mutable queue here.

mod coordinator;
mod loader;
mod markdown;
mod poller;

pub use coordinator::{FileSyncCoordinator, MemorySink, SyncHealth};
pub use loader::{has_extension, Loader, LoaderRegistry, MemoryCandidate};
pub use markdown::MarkdownLoader;
pub use poller::{Poller, SyncEvent, SyncEventKind};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::constants::DEFAULT_SYNC_QUEUE_CAPACITY;

/// Runs the poller and a bounded worker pool against a [`FileSyncCoordinator`]
/// until its shutdown signal fires.
pub struct FileSyncEngine {
    root: PathBuf,
    poll_interval: Duration,
    extensions: Vec<String>,
    workers: usize,
    coordinator: Arc<FileSyncCoordinator>,
}

impl FileSyncEngine {
    /// Build an engine watching `root` with the given poll interval,
    /// extension filter, and worker pool size.
    #[must_use]
    pub fn new(
        root: PathBuf,
        poll_interval: Duration,
        extensions: Vec<String>,
        workers: usize,
        coordinator: Arc<FileSyncCoordinator>,
    ) -> Self {
        Self { root, poll_interval, extensions, workers: workers.max(1), coordinator }
    }

    /// Run the poll/dispatch loop until `shutdown` is notified. The poller
    /// runs on the calling task; events fan out to `workers` concurrent
    /// consumers of a bounded channel — when the channel is saturated a
    /// tick's events are dropped and logged rather than blocking the
    /// poller indefinitely (`SPEC_FULL.md` §5's backpressure rule).
    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let (tx, rx) = mpsc::channel::<SyncEvent>(DEFAULT_SYNC_QUEUE_CAPACITY);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut worker_handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let rx = rx.clone();
            let coordinator = self.coordinator.clone();
            worker_handles.push(tokio::spawn(async move {
                loop {
                    let event = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };
                    match event {
                        Some(event) => {
                            debug!(worker_id, path = %event.path.display(), "processing sync event");
                            coordinator.handle_event(event).await;
                        }
                        None => break,
                    }
                }
            }));
        }

        let mut poller = Poller::new(self.root, self.extensions);
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match poller.tick() {
                        Ok(events) => {
                            for event in events {
                                if tx.try_send(event).is_err() {
                                    warn!("file sync queue saturated, dropping this tick's remaining events");
                                    break;
                                }
                            }
                        }
                        Err(err) => warn!(?err, "file sync poll tick failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        drop(tx);
        for handle in worker_handles {
            let _ = handle.await;
        }
    }

    /// Current sync health, delegated to the coordinator.
    pub async fn health(&self) -> SyncHealth {
        self.coordinator.health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingSink {
        stored: SyncMutex<usize>,
    }

    #[async_trait]
    impl MemorySink for RecordingSink {
        async fn store_candidate(
            &self,
            _candidate: &MemoryCandidate,
            _source_path: &str,
            _parent_id: Option<Uuid>,
        ) -> crate::error::Result<Uuid> {
            *self.stored.lock() += 1;
            Ok(Uuid::new_v4())
        }

        async fn delete_by_source(&self, _path: &str) -> crate::error::Result<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn engine_picks_up_a_file_added_after_startup() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let registry = Arc::new(LoaderRegistry::new().with_loader(Box::new(MarkdownLoader::new())));
        let coordinator = Arc::new(FileSyncCoordinator::new(sink.clone(), registry, true));

        let engine = FileSyncEngine::new(
            dir.path().to_path_buf(),
            Duration::from_millis(20),
            vec!["md".into()],
            2,
            coordinator,
        );

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let handle = tokio::spawn(engine.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(10)).await;
        std::fs::write(dir.path().join("a.md"), "hello world\n").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(*sink.stored.lock() >= 1);
    }
}
