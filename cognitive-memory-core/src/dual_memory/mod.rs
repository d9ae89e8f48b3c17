//! Dual-memory consolidation: recurring decay/eviction and episodic →
//! semantic promotion (`SPEC_FULL.md` §4.8).

mod decay;
mod promotion;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::constants::{
    DEFAULT_CONSOLIDATION_INTERVAL, DEFAULT_EVICT_FLOOR, PROMOTE_EDGE_STRENGTH_MIN,
    ZERO_ACCESS_EVICT_AFTER,
};
use crate::error::Result;
use crate::metastore::MetadataStore;
use crate::types::MemoryType;
use crate::vectorstore::VectorStore;

/// Tunable knobs for one [`DualMemoryManager`]; defaults mirror
/// `SPEC_FULL.md` §4.8.
#[derive(Debug, Clone)]
pub struct DualMemoryConfig {
    pub evict_floor: f32,
    pub zero_access_grace: Duration,
    pub promote_edge_strength_min: f32,
    pub sweep_interval: Duration,
}

impl Default for DualMemoryConfig {
    fn default() -> Self {
        Self {
            evict_floor: DEFAULT_EVICT_FLOOR,
            zero_access_grace: ZERO_ACCESS_EVICT_AFTER,
            promote_edge_strength_min: PROMOTE_EDGE_STRENGTH_MIN,
            sweep_interval: DEFAULT_CONSOLIDATION_INTERVAL,
        }
    }
}

/// Outcome of one consolidation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    pub evicted: usize,
    pub promoted: usize,
}

/// Runs the decay/eviction and promotion halves of consolidation, either
/// once on demand or as a recurring background task.
pub struct DualMemoryManager {
    vector_store: Arc<dyn VectorStore>,
    metadata_store: Arc<dyn MetadataStore>,
    config: DualMemoryConfig,
}

impl DualMemoryManager {
    #[must_use]
    pub fn new(vector_store: Arc<dyn VectorStore>, metadata_store: Arc<dyn MetadataStore>) -> Self {
        Self::with_config(vector_store, metadata_store, DualMemoryConfig::default())
    }

    #[must_use]
    pub fn with_config(
        vector_store: Arc<dyn VectorStore>,
        metadata_store: Arc<dyn MetadataStore>,
        config: DualMemoryConfig,
    ) -> Self {
        Self { vector_store, metadata_store, config }
    }

    /// Run one decay/eviction + promotion pass over every memory.
    ///
    /// # Errors
    /// Propagates store failures; a failure partway through still returns
    /// whatever was committed so far via the store's own atomicity, not
    /// this method's.
    pub async fn consolidate_once(&self) -> Result<ConsolidationReport> {
        let now = Utc::now();
        let mut report = ConsolidationReport::default();

        for memory in self.metadata_store.list_all().await? {
            if memory.memory_type != MemoryType::Episodic {
                continue;
            }

            if decay::is_evictable(&memory, now, self.config.evict_floor, self.config.zero_access_grace) {
                self.vector_store.delete(memory.level, &memory.vector_ref).await?;
                self.metadata_store.delete_memory(memory.id).await?;
                report.evicted += 1;
                debug!(memory_id = %memory.id, "evicted decayed memory");
                continue;
            }

            let strong_edges = self
                .metadata_store
                .connections_above_strength(memory.id, self.config.promote_edge_strength_min)
                .await?
                .len();

            if promotion::is_promotion_eligible(&memory, now, strong_edges) {
                let mut promoted = memory;
                promoted.promote();
                self.metadata_store.update_memory(&promoted).await?;
                report.promoted += 1;
                debug!(memory_id = %promoted.id, "promoted episodic memory to semantic");
            }
        }

        if report.evicted > 0 || report.promoted > 0 {
            info!(evicted = report.evicted, promoted = report.promoted, "consolidation pass complete");
        }

        Ok(report)
    }

    /// Run [`Self::consolidate_once`] on a recurring interval until the
    /// returned future is dropped (e.g. the owning task is aborted).
    pub async fn run_forever(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.consolidate_once().await {
                tracing::warn!(?err, "consolidation pass failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Memory, MemoryLevel};
    use cognitive_memory_test_utils::{InMemoryMetadataStore, InMemoryVectorStore};
    use std::collections::HashMap;

    #[tokio::test]
    async fn stale_unaccessed_memory_is_evicted() {
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let metadata_store = Arc::new(InMemoryMetadataStore::new());
        let manager = DualMemoryManager::new(vector_store.clone(), metadata_store.clone());

        let mut memory = Memory::new(MemoryLevel::Episode, "x".into(), HashMap::new(), "v1".into());
        memory.importance_score = 0.01;
        memory.created_at = Utc::now() - chrono::Duration::days(31);
        memory.last_accessed = memory.created_at;
        metadata_store.insert_memory(&memory).await.unwrap();
        vector_store.insert(MemoryLevel::Episode, "v1", &[1.0], HashMap::new()).await.unwrap();

        let report = manager.consolidate_once().await.unwrap();
        assert_eq!(report.evicted, 1);
        assert!(metadata_store.get_memory(memory.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn active_memory_with_strong_edges_is_promoted() {
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let metadata_store = Arc::new(InMemoryMetadataStore::new());
        let manager = DualMemoryManager::new(vector_store, metadata_store.clone());

        let mut memory = Memory::new(MemoryLevel::Episode, "x".into(), HashMap::new(), "v1".into());
        memory.access_count = 5;
        metadata_store.insert_memory(&memory).await.unwrap();

        let other = Memory::new(MemoryLevel::Episode, "y".into(), HashMap::new(), "v2".into());
        metadata_store.insert_memory(&other).await.unwrap();
        let another = Memory::new(MemoryLevel::Episode, "z".into(), HashMap::new(), "v3".into());
        metadata_store.insert_memory(&another).await.unwrap();

        let c1 = crate::types::Connection::new(memory.id, other.id, 0.9, crate::types::ConnectionKind::Associative);
        let c2 = crate::types::Connection::new(memory.id, another.id, 0.8, crate::types::ConnectionKind::Associative);
        metadata_store.upsert_connection(&c1).await.unwrap();
        metadata_store.upsert_connection(&c2).await.unwrap();

        let report = manager.consolidate_once().await.unwrap();
        assert_eq!(report.promoted, 1);
        let reloaded = metadata_store.get_memory(memory.id).await.unwrap().unwrap();
        assert_eq!(reloaded.memory_type, MemoryType::Semantic);
    }
}
