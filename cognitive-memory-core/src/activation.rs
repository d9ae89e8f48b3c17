//! Activation-spreading retrieval (`SPEC_FULL.md` §4.6).
//!
//! The associative graph lives in the metadata store as an adjacency list,
//! not as an in-memory object graph — activation holds only a working set
//! keyed by `id` with scalar activation values, so there are no reference
//! cycles to manage at runtime.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::constants::{
    DEFAULT_ACTIVATION_THRESHOLD, DEFAULT_MAX_ACTIVATIONS, DEFAULT_MAX_DEPTH,
    DEFAULT_SEED_FANOUT, MIN_SEED_SURVIVORS, SPREAD_DECAY_FACTOR, THRESHOLD_RELAXATION,
};
use crate::error::Result;
use crate::metastore::MetadataStore;
use crate::types::{Memory, MemoryLevel};
use crate::vectorstore::VectorStore;

/// Tunable knobs for one [`ActivationEngine`]; defaults mirror
/// `SPEC_FULL.md` §4.6.
#[derive(Debug, Clone)]
pub struct ActivationConfig {
    /// `θ`, the seed survival / spread-continuation threshold.
    pub threshold: f32,
    /// `k_seed`, how many L0 candidates are considered before filtering.
    pub seed_fanout: usize,
    /// `K`, the total activation cap across the whole traversal.
    pub max_activations: usize,
    /// `d_max`, the breadth-first depth bound.
    pub max_depth: u32,
    /// Decay factor applied to `θ` to get the spread-continuation floor.
    pub decay_factor: f32,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_ACTIVATION_THRESHOLD,
            seed_fanout: DEFAULT_SEED_FANOUT,
            max_activations: DEFAULT_MAX_ACTIVATIONS,
            max_depth: DEFAULT_MAX_DEPTH,
            decay_factor: SPREAD_DECAY_FACTOR,
        }
    }
}

/// One memory surfaced by retrieval, with the activation it accrued.
#[derive(Debug, Clone)]
pub struct ActivatedMemory {
    /// The retrieved memory, with access bookkeeping already applied.
    pub memory: Memory,
    /// Final scalar activation in `[0, 1]`.
    pub activation: f32,
}

/// Retrieval output: the top quartile by activation (`core`) and the
/// remainder (`peripheral`), both ordered by descending activation, ties
/// broken by descending `importance_score` then ascending `id`.
#[derive(Debug, Clone, Default)]
pub struct ActivationResult {
    pub core: Vec<ActivatedMemory>,
    pub peripheral: Vec<ActivatedMemory>,
}

impl ActivationResult {
    /// All activated memories regardless of core/peripheral classification,
    /// used as the "activated set" input to bridge discovery.
    #[must_use]
    pub fn all(&self) -> impl Iterator<Item = &ActivatedMemory> {
        self.core.iter().chain(self.peripheral.iter())
    }
}

/// Runs the two-phase seed-then-spread retrieval algorithm over a
/// [`VectorStore`] + [`MetadataStore`] pair.
pub struct ActivationEngine {
    vector_store: Arc<dyn VectorStore>,
    metadata_store: Arc<dyn MetadataStore>,
    config: ActivationConfig,
}

impl ActivationEngine {
    #[must_use]
    pub fn new(vector_store: Arc<dyn VectorStore>, metadata_store: Arc<dyn MetadataStore>) -> Self {
        Self::with_config(vector_store, metadata_store, ActivationConfig::default())
    }

    #[must_use]
    pub fn with_config(
        vector_store: Arc<dyn VectorStore>,
        metadata_store: Arc<dyn MetadataStore>,
        config: ActivationConfig,
    ) -> Self {
        Self { vector_store, metadata_store, config }
    }

    /// Run seed + spread for `query`, update access bookkeeping and
    /// importance for every activated memory, and classify the result into
    /// core/peripheral.
    ///
    /// # Errors
    /// Propagates store failures. A store inconsistency (a vector hit with
    /// no metadata row) is treated as absent rather than an error, per the
    /// reader-side consistency rule.
    pub async fn retrieve(&self, query: &[f32]) -> Result<ActivationResult> {
        let now = Utc::now();
        let activations = self.seed_and_spread(query).await?;
        if activations.is_empty() {
            return Ok(ActivationResult::default());
        }

        let mut activated = Vec::with_capacity(activations.len());
        for (id, activation) in activations {
            let Some(mut memory) = self.metadata_store.get_memory(id).await? else {
                continue;
            };
            memory.record_access(now);
            memory.importance_score = self.recompute_importance(&memory, now).await?;
            self.metadata_store.update_memory(&memory).await?;
            activated.push(ActivatedMemory { memory, activation });
        }

        Ok(Self::classify(activated))
    }

    async fn seed_and_spread(&self, query: &[f32]) -> Result<HashMap<Uuid, f32>> {
        let seeds = self
            .vector_store
            .search(MemoryLevel::Concept, query, self.config.seed_fanout, None)
            .await?;

        let mut effective_threshold = self.config.threshold;
        let mut survivors: Vec<_> = seeds.iter().filter(|h| h.score >= effective_threshold).collect();
        if survivors.len() < MIN_SEED_SURVIVORS {
            effective_threshold = (self.config.threshold - THRESHOLD_RELAXATION).max(0.0);
            survivors = seeds.iter().filter(|h| h.score >= effective_threshold).collect();
        }

        let mut activation: HashMap<Uuid, f32> = HashMap::new();
        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut frontier: VecDeque<(Uuid, u32)> = VecDeque::new();

        for hit in survivors {
            let Ok(id) = Uuid::parse_str(&hit.vector_ref) else { continue };
            activation.insert(id, hit.score);
            if visited.insert(id) {
                frontier.push_back((id, 0));
            }
        }

        let spread_floor = self.config.threshold * self.config.decay_factor;

        while let Some((node, depth)) = frontier.pop_front() {
            if visited.len() >= self.config.max_activations || depth >= self.config.max_depth {
                continue;
            }
            let a_n = *activation.get(&node).unwrap_or(&0.0);
            let edges = self.metadata_store.outgoing_connections(node).await?;
            for edge in edges {
                if visited.len() >= self.config.max_activations {
                    break;
                }
                let candidate = a_n * edge.strength;
                let current = activation.entry(edge.target_id).or_insert(0.0);
                if candidate > *current {
                    *current = candidate;
                }
                if candidate >= spread_floor && visited.insert(edge.target_id) {
                    frontier.push_back((edge.target_id, depth + 1));
                }
            }
        }

        Ok(activation)
    }

    async fn recompute_importance(&self, memory: &Memory, now: DateTime<Utc>) -> Result<f32> {
        let normalized_access = memory.access_count as f32 / (memory.access_count as f32 + 10.0);

        let age_days = (now - memory.last_accessed).num_seconds().max(0) as f32 / 86_400.0;
        let normalized_recency = (-age_days / 7.0).exp();

        let outgoing = self.metadata_store.outgoing_connections(memory.id).await?;
        let mean_edge_strength = if outgoing.is_empty() {
            0.0
        } else {
            outgoing.iter().map(|c| c.strength).sum::<f32>() / outgoing.len() as f32
        };

        Ok((0.4 * normalized_access + 0.3 * normalized_recency + 0.3 * mean_edge_strength).clamp(0.0, 1.0))
    }

    fn classify(mut activated: Vec<ActivatedMemory>) -> ActivationResult {
        activated.sort_by(|a, b| {
            b.activation
                .partial_cmp(&a.activation)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.memory
                        .importance_score
                        .partial_cmp(&a.memory.importance_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.memory.id.cmp(&b.memory.id))
        });

        let quartile = (activated.len() as f64 / 4.0).ceil() as usize;
        let quartile = quartile.max(1).min(activated.len());
        let peripheral = activated.split_off(quartile);
        ActivationResult { core: activated, peripheral }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cognitive_memory_test_utils::{InMemoryMetadataStore, InMemoryVectorStore};
    use proptest::prelude::*;

    fn memory_at(level: MemoryLevel, importance: f32) -> Memory {
        let mut m = Memory::new(level, "text".into(), HashMap::new(), Uuid::new_v4().to_string());
        m.importance_score = importance;
        m
    }

    #[tokio::test]
    async fn fewer_than_three_seeds_triggers_threshold_relaxation() {
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let metadata_store = Arc::new(InMemoryMetadataStore::new());
        let engine = ActivationEngine::new(vector_store.clone(), metadata_store.clone());

        let memory = memory_at(MemoryLevel::Concept, 0.5);
        metadata_store.insert_memory(&memory).await.unwrap();
        vector_store
            .insert(MemoryLevel::Concept, &memory.id.to_string(), &[1.0, 0.0], HashMap::new())
            .await
            .unwrap();

        // Score against [1.0, 0.0] with a query of [0.65, 0.1] lands below the
        // default 0.7 threshold but above the relaxed 0.6 floor.
        let result = engine.retrieve(&[0.65, 0.1]).await.unwrap();
        assert!(!result.core.is_empty() || !result.peripheral.is_empty());
    }

    #[tokio::test]
    async fn empty_store_returns_empty_result() {
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let metadata_store = Arc::new(InMemoryMetadataStore::new());
        let engine = ActivationEngine::new(vector_store, metadata_store);

        let result = engine.retrieve(&[1.0, 0.0]).await.unwrap();
        assert!(result.core.is_empty());
        assert!(result.peripheral.is_empty());
    }

    #[tokio::test]
    async fn spread_reaches_connected_memory_beyond_seed() {
        let vector_store = Arc::new(InMemoryVectorStore::new());
        let metadata_store = Arc::new(InMemoryMetadataStore::new());
        let engine = ActivationEngine::new(vector_store.clone(), metadata_store.clone());

        let seed = memory_at(MemoryLevel::Concept, 0.5);
        let neighbor = memory_at(MemoryLevel::Context, 0.5);
        metadata_store.insert_memory(&seed).await.unwrap();
        metadata_store.insert_memory(&neighbor).await.unwrap();
        vector_store
            .insert(MemoryLevel::Concept, &seed.id.to_string(), &[1.0, 0.0], HashMap::new())
            .await
            .unwrap();

        let connection =
            crate::types::Connection::new(seed.id, neighbor.id, 0.9, crate::types::ConnectionKind::Associative);
        metadata_store.upsert_connection(&connection).await.unwrap();

        let result = engine.retrieve(&[1.0, 0.0]).await.unwrap();
        let ids: Vec<_> = result.all().map(|a| a.memory.id).collect();
        assert!(ids.contains(&neighbor.id));
    }

    proptest! {
        /// However long a fully-connected chain of memories is and whatever
        /// `max_activations` is configured to, the total number of activated
        /// memories (core plus peripheral) never exceeds that cap.
        #[test]
        fn total_activations_never_exceeds_the_configured_cap(
            chain_len in 1usize..40,
            cap in 1usize..20,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let vector_store = Arc::new(InMemoryVectorStore::new());
                let metadata_store = Arc::new(InMemoryMetadataStore::new());

                let mut chain = Vec::with_capacity(chain_len);
                for _ in 0..chain_len {
                    chain.push(memory_at(MemoryLevel::Concept, 0.5));
                }
                for memory in &chain {
                    metadata_store.insert_memory(memory).await.unwrap();
                }
                vector_store
                    .insert(MemoryLevel::Concept, &chain[0].id.to_string(), &[1.0, 0.0], HashMap::new())
                    .await
                    .unwrap();
                for pair in chain.windows(2) {
                    let edge = crate::types::Connection::new(pair[0].id, pair[1].id, 1.0, crate::types::ConnectionKind::Associative);
                    metadata_store.upsert_connection(&edge).await.unwrap();
                }

                let config = ActivationConfig {
                    max_activations: cap,
                    max_depth: chain_len as u32 + 1,
                    seed_fanout: chain_len + 1,
                    ..ActivationConfig::default()
                };
                let engine = ActivationEngine::with_config(vector_store, metadata_store, config);
                let result = engine.retrieve(&[1.0, 0.0]).await.unwrap();

                prop_assert!(result.core.len() + result.peripheral.len() <= cap);
                Ok(())
            })?;
        }
    }
}
