//! Bridge discovery: surfaces memories that are semantically far from the
//! query yet strongly connected to the just-activated set
//! (`SPEC_FULL.md` §4.7).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::Utc;

use super::cache::BridgeCache;
use crate::activation::ActivatedMemory;
use crate::constants::{
    BRIDGE_CACHE_TTL, DEFAULT_BRIDGE_CANDIDATES, DEFAULT_BRIDGE_CP_MIN, DEFAULT_BRIDGE_K,
    DEFAULT_BRIDGE_NOVELTY_MIN,
};
use crate::embeddings::cosine_similarity;
use crate::error::Result;
use crate::metastore::{BridgeCacheEntry, MetadataStore};
use crate::types::MemoryLevel;
use crate::vectorstore::VectorStore;

/// Tunable knobs for one [`BridgeDiscovery`]; defaults mirror
/// `SPEC_FULL.md` §4.7.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub candidate_pool: usize,
    pub bridge_count: usize,
    pub novelty_min: f32,
    pub connection_potential_min: f32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            candidate_pool: DEFAULT_BRIDGE_CANDIDATES,
            bridge_count: DEFAULT_BRIDGE_K,
            novelty_min: DEFAULT_BRIDGE_NOVELTY_MIN,
            connection_potential_min: DEFAULT_BRIDGE_CP_MIN,
        }
    }
}

/// A surfaced bridge memory and the scores that qualified it.
#[derive(Debug, Clone)]
pub struct Bridge {
    pub memory_id: uuid::Uuid,
    pub bridge_score: f32,
    pub novelty: f32,
    pub connection_potential: f32,
}

/// Finds serendipitous "bridge" memories and caches results per query
/// fingerprint. The candidate pool is drawn by staleness rank (a
/// deterministic stand-in for "sampling weighted by inverse recency" that
/// keeps retrieval reproducible in tests) rather than weighted random
/// sampling.
pub struct BridgeDiscovery {
    vector_store: Arc<dyn VectorStore>,
    metadata_store: Arc<dyn MetadataStore>,
    cache: BridgeCache,
    config: BridgeConfig,
}

impl BridgeDiscovery {
    #[must_use]
    pub fn new(vector_store: Arc<dyn VectorStore>, metadata_store: Arc<dyn MetadataStore>) -> Self {
        Self::with_config(vector_store, metadata_store, BridgeConfig::default())
    }

    #[must_use]
    pub fn with_config(
        vector_store: Arc<dyn VectorStore>,
        metadata_store: Arc<dyn MetadataStore>,
        config: BridgeConfig,
    ) -> Self {
        Self { vector_store, metadata_store, cache: BridgeCache::new(BRIDGE_CACHE_TTL), config }
    }

    /// Hit/miss/eviction counters for the in-process bridge cache, surfaced
    /// by the façade's `stats()` operation.
    #[must_use]
    pub fn cache_metrics(&self) -> super::cache::BridgeCacheMetrics {
        self.cache.metrics()
    }

    /// Fingerprint a query plus its retrieval parameters for cache keying.
    #[must_use]
    pub fn fingerprint(&self, fused_query: &[f32]) -> String {
        let mut hasher = DefaultHasher::new();
        for v in fused_query {
            v.to_bits().hash(&mut hasher);
        }
        self.config.bridge_count.hash(&mut hasher);
        self.config.novelty_min.to_bits().hash(&mut hasher);
        self.config.connection_potential_min.to_bits().hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// Find up to `bridge_count` bridges for `fused_query` given the
    /// just-activated set.
    ///
    /// # Errors
    /// Propagates vector/metadata store failures.
    pub async fn discover(&self, fused_query: &[f32], activated: &[ActivatedMemory]) -> Result<Vec<Bridge>> {
        let fingerprint = self.fingerprint(fused_query);
        if let Some(cached) = self.cache.get(&fingerprint) {
            return Ok(cached.into_iter().map(Self::entry_to_bridge).collect());
        }

        let activated_ids: std::collections::HashSet<_> = activated.iter().map(|a| a.memory.id).collect();

        let mut activated_vectors = Vec::with_capacity(activated.len());
        for a in activated {
            if let Some(v) = self.vector_store.get_vector(a.memory.level, &a.memory.vector_ref).await? {
                activated_vectors.push(v);
            }
        }

        let stale_pool = self
            .metadata_store
            .list_by_access_recency(&[MemoryLevel::Context, MemoryLevel::Episode])
            .await?;

        let candidates: Vec<_> = stale_pool
            .into_iter()
            .filter(|m| !activated_ids.contains(&m.id))
            .take(self.config.candidate_pool)
            .collect();

        let mut bridges = Vec::new();
        for candidate in candidates {
            let Some(v_c) = self.vector_store.get_vector(candidate.level, &candidate.vector_ref).await?
            else {
                continue;
            };

            let novelty = 1.0 - cosine_similarity(fused_query, &v_c);

            let max_sim = activated_vectors
                .iter()
                .map(|v_a| cosine_similarity(v_a, &v_c))
                .fold(0.0f32, f32::max);

            let mut max_edge_strength = 0.0f32;
            for a in activated {
                if let Some(c) = self.metadata_store.get_connection(candidate.id, a.memory.id).await? {
                    max_edge_strength = max_edge_strength.max(c.strength);
                }
                if let Some(c) = self.metadata_store.get_connection(a.memory.id, candidate.id).await? {
                    max_edge_strength = max_edge_strength.max(c.strength);
                }
            }

            let connection_potential = max_sim.max(max_edge_strength);
            if novelty < self.config.novelty_min || connection_potential < self.config.connection_potential_min {
                continue;
            }

            let bridge_score = 0.6 * novelty + 0.4 * connection_potential;
            bridges.push(Bridge {
                memory_id: candidate.id,
                bridge_score,
                novelty,
                connection_potential,
            });
        }

        bridges.sort_by(|a, b| {
            b.bridge_score.partial_cmp(&a.bridge_score).unwrap_or(std::cmp::Ordering::Equal)
        });
        bridges.truncate(self.config.bridge_count);

        let now = Utc::now();
        let cache_entries: Vec<BridgeCacheEntry> = bridges
            .iter()
            .map(|b| BridgeCacheEntry {
                query_fingerprint: fingerprint.clone(),
                memory_id: b.memory_id,
                bridge_score: b.bridge_score,
                novelty_score: b.novelty,
                connection_potential: b.connection_potential,
                created_at: now,
            })
            .collect();
        self.cache.put(fingerprint.clone(), cache_entries.clone());
        self.metadata_store.put_bridge_cache(&fingerprint, cache_entries).await?;

        Ok(bridges)
    }

    fn entry_to_bridge(entry: BridgeCacheEntry) -> Bridge {
        Bridge {
            memory_id: entry.memory_id,
            bridge_score: entry.bridge_score,
            novelty: entry.novelty_score,
            connection_potential: entry.connection_potential,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Memory;
    use cognitive_memory_test_utils::{InMemoryMetadataStore, InMemoryVectorStore};
    use std::collections::HashMap;

    #[tokio::test]
    async fn candidate_below_novelty_floor_is_excluded() {
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let metadata_store = Arc::new(InMemoryMetadataStore::new());
        let discovery = BridgeDiscovery::new(vector_store.clone(), metadata_store.clone());

        let candidate = Memory::new(MemoryLevel::Episode, "c".into(), HashMap::new(), "ref-c".into());
        metadata_store.insert_memory(&candidate).await.unwrap();
        vector_store
            .insert(MemoryLevel::Episode, "ref-c", &[1.0, 0.0], HashMap::new())
            .await
            .unwrap();

        // Query identical to candidate vector: novelty = 0, below the 0.4 floor.
        let bridges = discovery.discover(&[1.0, 0.0], &[]).await.unwrap();
        assert!(bridges.is_empty());
    }

    #[tokio::test]
    async fn fingerprint_is_stable_for_identical_inputs() {
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let metadata_store = Arc::new(InMemoryMetadataStore::new());
        let discovery = BridgeDiscovery::new(vector_store, metadata_store);

        assert_eq!(discovery.fingerprint(&[1.0, 0.0]), discovery.fingerprint(&[1.0, 0.0]));
        assert_ne!(discovery.fingerprint(&[1.0, 0.0]), discovery.fingerprint(&[0.0, 1.0]));
    }
}
