//! End-to-end check that [`cognitive_memory_core::facade::CognitiveMemory`]
//! works against the libSQL backend the same way it does against the
//! in-memory test stores, exercising store/recall/delete_by_source/stats
//! through a networked-shaped schema.

use std::sync::Arc;

use cognitive_memory_core::facade::{CognitiveMemory, MemoryConfig, RecallLimits, StoreContext};
use cognitive_memory_core::{Config, MemoryLevel};
use cognitive_memory_storage_turso::TursoStore;

async fn memory_with_turso_backend() -> (CognitiveMemory, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("facade.db");
    let store = Arc::new(TursoStore::open_local(path.to_str().unwrap()).await.unwrap());
    let config = MemoryConfig::from_config(&Config::default(), store.clone(), store);
    let memory = CognitiveMemory::new(config).await.unwrap();
    (memory, dir)
}

#[tokio::test]
async fn store_then_recall_round_trips_through_libsql() {
    let (memory, _dir) = memory_with_turso_backend().await;

    memory
        .store(
            "the quarterly roadmap review went well",
            StoreContext { level_hint: Some(MemoryLevel::Episode), ..Default::default() },
            None,
        )
        .await
        .unwrap();
    let stored = memory
        .store(
            "roadmap planning requires stakeholder buy-in",
            StoreContext { level_hint: Some(MemoryLevel::Episode), ..Default::default() },
            None,
        )
        .await
        .unwrap();

    let result = memory.recall("roadmap planning", RecallLimits::default(), None).await.unwrap();
    let surfaced = result.core.iter().chain(result.peripheral.iter()).any(|item| item.id == stored.memory_id);
    assert!(surfaced);
}

#[tokio::test]
async fn delete_by_source_removes_every_memory_from_that_path() {
    let (memory, _dir) = memory_with_turso_backend().await;

    memory
        .store(
            "note one",
            StoreContext {
                level_hint: Some(MemoryLevel::Episode),
                source_path: Some("notes/daily.md".into()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    memory
        .store(
            "note two",
            StoreContext {
                level_hint: Some(MemoryLevel::Episode),
                source_path: Some("notes/daily.md".into()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let deleted = memory.delete_by_source("notes/daily.md").await.unwrap();
    assert_eq!(deleted, 2);
}

#[tokio::test]
async fn stats_reports_counts_by_level() {
    let (memory, _dir) = memory_with_turso_backend().await;
    memory
        .store("a concept", StoreContext { level_hint: Some(MemoryLevel::Concept), ..Default::default() }, None)
        .await
        .unwrap();
    memory
        .store("an episode", StoreContext { level_hint: Some(MemoryLevel::Episode), ..Default::default() }, None)
        .await
        .unwrap();

    let stats = memory.stats().await.unwrap();
    let total: usize = stats.counts_by_level.values().sum();
    assert_eq!(total, 2);
}
