//! `CognitiveMemory`: the single entry point composing the encoder, the
//! two stores, activation, bridge discovery, and the dual-memory manager
//! behind `SPEC_FULL.md` §6's five operations (`store`, `recall`,
//! `consolidate`, `stats`, `delete_by_source`), plus lifecycle and startup
//! reconciliation (§7). Grounded in the teacher's `SelfLearningMemory`
//! builder shape (`memory/core/builder.rs`): a config struct, `Arc`-shared
//! collaborators, and a lock-guarded mutable section for counters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::activation::{ActivationConfig, ActivationEngine, ActivationResult};
use crate::bridge::{Bridge, BridgeConfig, BridgeDiscovery};
use crate::config::Config;
use crate::constants::REINFORCEMENT_ETA;
use crate::dimensions::{DimensionExtractor, LexiconDimensionExtractor};
use crate::dual_memory::{ConsolidationReport, DualMemoryConfig, DualMemoryManager};
use crate::embeddings::{EmbeddingProvider, HashingEmbeddingProvider};
use crate::encoder::CognitiveEncoder;
use crate::error::{Error, Result};
use crate::file_sync::{MemoryCandidate, MemorySink, SyncHealth};
use crate::metastore::MetadataStore;
use crate::types::{Connection, ConnectionKind, DimensionName, Memory, MemoryLevel, RetrievalKind, RetrievalStat};
use crate::vectorstore::VectorStore;

/// Construction-time configuration for [`CognitiveMemory`]. Distinct from
/// [`Config`] (the environment/TOML-driven surface): this is the set of
/// already-resolved collaborators and tunables a caller assembles once
/// `Config` has been loaded and the concrete stores/providers chosen.
pub struct MemoryConfig {
    pub vector_store: Arc<dyn VectorStore>,
    pub metadata_store: Arc<dyn MetadataStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub dimension_extractor: Arc<dyn DimensionExtractor>,
    pub activation: ActivationConfig,
    pub bridge: BridgeConfig,
    pub dual_memory: DualMemoryConfig,
    pub fusion_alpha: f32,
}

impl MemoryConfig {
    /// Build a config from a loaded [`Config`] plus the two required
    /// stores, using the default hashing embedder and lexicon dimension
    /// extractor (the provider/extractor are swappable post-construction
    /// only by building a fresh `MemoryConfig`).
    #[must_use]
    pub fn from_config(
        config: &Config,
        vector_store: Arc<dyn VectorStore>,
        metadata_store: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            vector_store,
            metadata_store,
            embedder: Arc::new(HashingEmbeddingProvider::new()),
            dimension_extractor: Arc::new(LexiconDimensionExtractor::new()),
            activation: ActivationConfig {
                threshold: config.activation_threshold,
                seed_fanout: config.seed_fanout,
                max_activations: config.max_activations,
                max_depth: config.max_depth,
                ..ActivationConfig::default()
            },
            bridge: BridgeConfig {
                candidate_pool: config.bridge_candidates,
                bridge_count: config.bridge_k,
                novelty_min: config.bridge_novelty_min,
                connection_potential_min: config.bridge_cp_min,
            },
            dual_memory: DualMemoryConfig {
                evict_floor: config.evict_floor,
                promote_edge_strength_min: crate::constants::PROMOTE_EDGE_STRENGTH_MIN,
                ..DualMemoryConfig::default()
            },
            fusion_alpha: crate::constants::DEFAULT_FUSION_ALPHA,
        }
    }
}

/// Optional hints accepted by [`CognitiveMemory::store`].
#[derive(Debug, Clone, Default)]
pub struct StoreContext {
    pub level_hint: Option<MemoryLevel>,
    pub parent_id: Option<Uuid>,
    pub source_path: Option<String>,
}

/// Result of a successful [`CognitiveMemory::store`] call.
#[derive(Debug, Clone)]
pub struct StoreResult {
    pub memory_id: Uuid,
    pub dimensions: HashMap<DimensionName, f32>,
}

/// Per-recall size/selection limits.
#[derive(Debug, Clone)]
pub struct RecallLimits {
    pub k_core: usize,
    pub k_peripheral: usize,
    pub k_bridge: usize,
}

impl Default for RecallLimits {
    fn default() -> Self {
        Self { k_core: 10, k_peripheral: 20, k_bridge: crate::constants::DEFAULT_BRIDGE_K }
    }
}

/// One item in a [`RecallResult`] bucket: the memory plus a human-readable
/// `why` explaining its inclusion.
#[derive(Debug, Clone)]
pub struct RecallItem {
    pub id: Uuid,
    pub content: String,
    pub score: f32,
    pub why: String,
}

/// Output of [`CognitiveMemory::recall`].
#[derive(Debug, Clone, Default)]
pub struct RecallResult {
    pub core: Vec<RecallItem>,
    pub peripheral: Vec<RecallItem>,
    pub bridges: Vec<RecallItem>,
}

/// Output of [`CognitiveMemory::stats`].
#[derive(Debug, Clone, Default)]
pub struct SystemStats {
    pub counts_by_level: HashMap<MemoryLevel, usize>,
    pub connection_count: usize,
    pub bridge_cache_hit_ratio: f32,
    pub sync_health: SyncHealth,
}

/// Result of the startup orphan sweep (`SPEC_FULL.md` §7).
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    /// Vectors with no matching metadata row, removed from the vector store.
    pub orphan_vectors_removed: usize,
    /// Metadata rows with no matching vector, re-embedded from `content`.
    pub orphan_metadata_reembedded: usize,
}

/// Reconciles a vector store and metadata store pair by listing every
/// `vector_ref` on each side per collection and resolving the mismatch:
/// a vector with no metadata row is deleted; a metadata row with no
/// vector is re-embedded from its stored `content` using `encoder`.
///
/// # Errors
/// Propagates store or encoder failures encountered during the sweep.
pub async fn reconcile(
    vector_store: &Arc<dyn VectorStore>,
    metadata_store: &Arc<dyn MetadataStore>,
    encoder: &CognitiveEncoder,
) -> Result<ReconciliationReport> {
    let mut report = ReconciliationReport::default();

    for level in [MemoryLevel::Concept, MemoryLevel::Context, MemoryLevel::Episode] {
        let vector_refs = vector_store.list_refs(level).await?;
        let memories = metadata_store.list_by_level(level).await?;
        let memory_refs: std::collections::HashSet<&str> =
            memories.iter().map(|m| m.vector_ref.as_str()).collect();

        for vector_ref in &vector_refs {
            if !memory_refs.contains(vector_ref.as_str()) {
                warn!(%vector_ref, ?level, "orphan vector with no metadata row, removing");
                vector_store.delete(level, vector_ref).await?;
                report.orphan_vectors_removed += 1;
            }
        }

        let ref_set: std::collections::HashSet<&str> = vector_refs.iter().map(String::as_str).collect();
        for memory in &memories {
            if !ref_set.contains(memory.vector_ref.as_str()) {
                warn!(memory_id = %memory.id, ?level, "orphan metadata row with no vector, re-embedding");
                let encoded = encoder.encode(&memory.content).await?;
                let mut payload = HashMap::new();
                if let Some(path) = &memory.source_path {
                    payload.insert("source_path".to_string(), path.clone());
                }
                vector_store.insert(level, &memory.vector_ref, &encoded.fused_vector, payload).await?;
                report.orphan_metadata_reembedded += 1;
            }
        }
    }

    if report.orphan_vectors_removed > 0 || report.orphan_metadata_reembedded > 0 {
        info!(
            removed = report.orphan_vectors_removed,
            reembedded = report.orphan_metadata_reembedded,
            "startup reconciliation complete"
        );
    }

    Ok(report)
}

struct Health {
    bridge_cache_hits: u64,
    bridge_cache_lookups: u64,
}

/// The single entry point composing the cognitive memory engine. Cheap to
/// clone-by-`Arc`-share: every collaborator is already `Arc`-wrapped, and
/// the mutable section is a single `tokio::sync::RwLock`-guarded struct of
/// counters, matching the concurrency model's "bridge cache and in-memory
/// statistics guarded by fine-grained locks" note (`SPEC_FULL.md` §5).
pub struct CognitiveMemory {
    vector_store: Arc<dyn VectorStore>,
    metadata_store: Arc<dyn MetadataStore>,
    encoder: Arc<CognitiveEncoder>,
    activation: ActivationEngine,
    bridge: BridgeDiscovery,
    dual_memory: Arc<DualMemoryManager>,
    id_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    health: RwLock<Health>,
}

impl CognitiveMemory {
    /// Build a fresh system from `config`, running startup reconciliation
    /// before returning.
    ///
    /// # Errors
    /// Propagates store/encoder failures encountered during reconciliation.
    pub async fn new(config: MemoryConfig) -> Result<Self> {
        let encoder = Arc::new(CognitiveEncoder::with_alpha(
            config.embedder.clone(),
            config.dimension_extractor.clone(),
            config.fusion_alpha,
        ));

        reconcile(&config.vector_store, &config.metadata_store, &encoder).await?;

        Ok(Self::with_encoder(config, encoder))
    }

    /// Build a system without running reconciliation (used by tests that
    /// want a deterministic, already-consistent store).
    #[must_use]
    pub fn with_config(config: MemoryConfig) -> Self {
        let encoder = Arc::new(CognitiveEncoder::with_alpha(
            config.embedder.clone(),
            config.dimension_extractor.clone(),
            config.fusion_alpha,
        ));
        Self::with_encoder(config, encoder)
    }

    fn with_encoder(config: MemoryConfig, encoder: Arc<CognitiveEncoder>) -> Self {
        let activation = ActivationEngine::with_config(
            config.vector_store.clone(),
            config.metadata_store.clone(),
            config.activation,
        );
        let bridge = BridgeDiscovery::with_config(
            config.vector_store.clone(),
            config.metadata_store.clone(),
            config.bridge,
        );
        let dual_memory = Arc::new(DualMemoryManager::with_config(
            config.vector_store.clone(),
            config.metadata_store.clone(),
            config.dual_memory,
        ));

        Self {
            vector_store: config.vector_store,
            metadata_store: config.metadata_store,
            encoder,
            activation,
            bridge,
            dual_memory,
            id_locks: Mutex::new(HashMap::new()),
            health: RwLock::new(Health { bridge_cache_hits: 0, bridge_cache_lookups: 0 }),
        }
    }

    /// Spawn the dual-memory manager's recurring consolidation sweep on
    /// the current `tokio` runtime. Returns a handle the caller can abort
    /// on shutdown.
    #[must_use]
    pub fn spawn_consolidation(&self) -> tokio::task::JoinHandle<()> {
        let manager = self.dual_memory.clone();
        tokio::spawn(async move { manager.run_forever().await })
    }

    async fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.id_locks.lock().await;
        locks.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Encode and store `text`, applying an optional deadline.
    ///
    /// Uses the write-ahead pattern from `SPEC_FULL.md` §4.5: the vector is
    /// inserted first; if the metadata insert then fails, the vector is
    /// deleted as a compensating action so the two stores never disagree
    /// about a half-written memory.
    ///
    /// # Errors
    /// `Validation` for empty text; `Timeout` if `deadline` elapses;
    /// otherwise whatever the underlying stores or encoder return.
    pub async fn store(
        &self,
        text: &str,
        context: StoreContext,
        deadline: Option<Duration>,
    ) -> Result<StoreResult> {
        let future = self.store_inner(text, context);
        match deadline {
            Some(d) => tokio::time::timeout(d, future).await.map_err(|_| Error::Timeout)?,
            None => future.await,
        }
    }

    async fn store_inner(&self, text: &str, context: StoreContext) -> Result<StoreResult> {
        if text.trim().is_empty() {
            return Err(Error::Validation("store text must not be empty".to_string()));
        }

        if let Some(parent_id) = context.parent_id {
            let parent = self
                .metadata_store
                .get_memory(parent_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("parent memory {parent_id}")))?;
            let level = context.level_hint.unwrap_or(MemoryLevel::Episode);
            if parent.level >= level {
                return Err(Error::Validation(format!(
                    "parent_id {parent_id} has level {:?}, not strictly below {:?}",
                    parent.level, level
                )));
            }
        }

        let encoded = self.encoder.encode(text).await?;
        let level = context.level_hint.unwrap_or(MemoryLevel::Episode);

        // The activation engine's seed phase recovers a memory's id by
        // parsing its vector hit's `vector_ref` back into a `Uuid` (it has
        // no other way to go from a bare vector-store hit to a metadata
        // row without an extra round trip). That only works if `vector_ref`
        // *is* the memory's id, so we mint the id first and reuse it as the
        // vector key rather than generating the two independently.
        let memory_id = Uuid::new_v4();
        let vector_ref = memory_id.to_string();

        let mut payload = HashMap::new();
        if let Some(path) = &context.source_path {
            payload.insert("source_path".to_string(), path.clone());
        }

        self.vector_store.insert(level, &vector_ref, &encoded.fused_vector, payload).await?;

        let mut memory = Memory::new(level, text.to_string(), encoded.dimensions.clone(), vector_ref)
            .with_parent(context.parent_id)
            .with_source_path(context.source_path);
        memory.id = memory_id;

        if let Err(err) = self.metadata_store.insert_memory(&memory).await {
            warn!(%memory_id, ?err, "metadata insert failed, compensating vector delete");
            self.vector_store.delete(level, &memory.vector_ref).await?;
            return Err(err);
        }

        Ok(StoreResult { memory_id, dimensions: encoded.dimensions })
    }

    /// Retrieve core/peripheral/bridge results for `query`, reinforcing
    /// the edges between every pair of co-retrieved memories and logging
    /// a [`RetrievalStat`] per surfaced memory.
    ///
    /// # Errors
    /// `Timeout` if `deadline` elapses; otherwise whatever the activation
    /// engine, bridge discovery, or stores return.
    pub async fn recall(
        &self,
        query: &str,
        limits: RecallLimits,
        deadline: Option<Duration>,
    ) -> Result<RecallResult> {
        let future = self.recall_inner(query, limits);
        match deadline {
            Some(d) => tokio::time::timeout(d, future).await.map_err(|_| Error::Timeout)?,
            None => future.await,
        }
    }

    async fn recall_inner(&self, query: &str, limits: RecallLimits) -> Result<RecallResult> {
        let encoded = self.encoder.encode(query).await?;
        let activation = self.activation.retrieve(&encoded.fused_vector).await?;

        let activated: Vec<_> = activation.all().cloned().collect();
        let bridge_metrics_before = self.bridge.cache_metrics();
        let bridges = self.bridge.discover(&encoded.fused_vector, &activated).await?;
        let bridge_metrics_after = self.bridge.cache_metrics();
        {
            let mut health = self.health.write().await;
            health.bridge_cache_lookups += 1;
            if bridge_metrics_after.hits > bridge_metrics_before.hits {
                health.bridge_cache_hits += 1;
            }
        }

        self.reinforce_co_retrieved(&activation).await?;
        self.log_retrieval_stats(&activation, &bridges, self.bridge.fingerprint(&encoded.fused_vector)).await?;

        let core = activation
            .core
            .iter()
            .take(limits.k_core)
            .map(|a| RecallItem {
                id: a.memory.id,
                content: a.memory.content.clone(),
                score: a.activation,
                why: "activation spreading: core".to_string(),
            })
            .collect();
        let peripheral = activation
            .peripheral
            .iter()
            .take(limits.k_peripheral)
            .map(|a| RecallItem {
                id: a.memory.id,
                content: a.memory.content.clone(),
                score: a.activation,
                why: "activation spreading: peripheral".to_string(),
            })
            .collect();

        let mut bridge_items = Vec::new();
        for bridge in bridges.into_iter().take(limits.k_bridge) {
            if let Some(memory) = self.metadata_store.get_memory(bridge.memory_id).await? {
                bridge_items.push(RecallItem {
                    id: memory.id,
                    content: memory.content,
                    score: bridge.bridge_score,
                    why: format!(
                        "bridge: novelty {:.2}, connection potential {:.2}",
                        bridge.novelty, bridge.connection_potential
                    ),
                });
            }
        }

        Ok(RecallResult { core, peripheral, bridges: bridge_items })
    }

    async fn reinforce_co_retrieved(&self, activation: &ActivationResult) -> Result<()> {
        let activated: Vec<_> = activation.all().collect();
        let now = Utc::now();
        for i in 0..activated.len() {
            for j in (i + 1)..activated.len() {
                let (winner, loser) = if activated[i].activation >= activated[j].activation {
                    (activated[i], activated[j])
                } else {
                    (activated[j], activated[i])
                };
                let min_activation = loser.activation.min(winner.activation);
                let existing = self.metadata_store.get_connection(winner.memory.id, loser.memory.id).await?;
                let mut connection = existing.unwrap_or_else(|| {
                    Connection::new(winner.memory.id, loser.memory.id, 0.0, ConnectionKind::Associative)
                });
                connection.reinforce(REINFORCEMENT_ETA, min_activation, now);
                self.metadata_store.upsert_connection(&connection).await?;
            }
        }
        Ok(())
    }

    async fn log_retrieval_stats(
        &self,
        activation: &ActivationResult,
        bridges: &[Bridge],
        fingerprint: String,
    ) -> Result<()> {
        let now = Utc::now();
        for activated in &activation.core {
            self.metadata_store
                .append_retrieval_stat(&RetrievalStat {
                    query_fingerprint: fingerprint.clone(),
                    memory_id: activated.memory.id,
                    kind: RetrievalKind::Core,
                    success_score: None,
                    timestamp: now,
                })
                .await?;
        }
        for activated in &activation.peripheral {
            self.metadata_store
                .append_retrieval_stat(&RetrievalStat {
                    query_fingerprint: fingerprint.clone(),
                    memory_id: activated.memory.id,
                    kind: RetrievalKind::Peripheral,
                    success_score: None,
                    timestamp: now,
                })
                .await?;
        }
        for bridge in bridges {
            self.metadata_store
                .append_retrieval_stat(&RetrievalStat {
                    query_fingerprint: fingerprint.clone(),
                    memory_id: bridge.memory_id,
                    kind: RetrievalKind::Bridge,
                    success_score: None,
                    timestamp: now,
                })
                .await?;
        }
        Ok(())
    }

    /// Run one consolidation pass (decay/eviction + promotion).
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn consolidate(&self) -> Result<ConsolidationReport> {
        self.dual_memory.consolidate_once().await
    }

    /// Per-level counts, edge count, bridge-cache hit ratio, and sync
    /// health (sync health is always default/clean here; a caller running
    /// a [`crate::file_sync::FileSyncEngine`] should overlay its own
    /// `health()` onto the returned stats).
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn stats(&self) -> Result<SystemStats> {
        let mut counts_by_level = HashMap::new();
        let mut connection_count = 0usize;
        for level in [MemoryLevel::Concept, MemoryLevel::Context, MemoryLevel::Episode] {
            let memories = self.metadata_store.list_by_level(level).await?;
            connection_count += {
                let mut count = 0;
                for memory in &memories {
                    count += self.metadata_store.outgoing_connections(memory.id).await?.len();
                }
                count
            };
            counts_by_level.insert(level, memories.len());
        }

        let health = self.health.read().await;
        let hit_ratio = if health.bridge_cache_lookups == 0 {
            0.0
        } else {
            health.bridge_cache_hits as f32 / health.bridge_cache_lookups as f32
        };

        Ok(SystemStats {
            counts_by_level,
            connection_count,
            bridge_cache_hit_ratio: hit_ratio,
            sync_health: SyncHealth::default(),
        })
    }

    /// Delete every memory whose `source_path` equals `path`, from both
    /// stores. Returns the count deleted.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn delete_by_source(&self, path: &str) -> Result<u64> {
        let memories = self.metadata_store.list_by_source_path(path).await?;
        let mut deleted = 0u64;
        for memory in memories {
            let lock = self.lock_for(memory.id).await;
            let _guard = lock.lock().await;
            self.metadata_store.delete_memory(memory.id).await?;
            self.vector_store.delete(memory.level, &memory.vector_ref).await?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Encode `text` with this system's encoder without storing it —
    /// exposed for callers (the CLI, tests) that want the fused vector or
    /// dimension scores without a side effect.
    ///
    /// # Errors
    /// Propagates the encoder's failure.
    pub async fn encode_preview(&self, text: &str) -> Result<crate::encoder::EncodedText> {
        self.encoder.encode(text).await
    }
}

#[async_trait]
impl MemorySink for CognitiveMemory {
    async fn store_candidate(
        &self,
        candidate: &MemoryCandidate,
        source_path: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Uuid> {
        let context = StoreContext {
            level_hint: Some(candidate.level),
            parent_id,
            source_path: Some(source_path.to_string()),
        };
        let result = self.store(&candidate.text, context, None).await?;
        Ok(result.memory_id)
    }

    async fn delete_by_source(&self, path: &str) -> Result<u64> {
        CognitiveMemory::delete_by_source(self, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cognitive_memory_test_utils::{InMemoryMetadataStore, InMemoryVectorStore};
    use proptest::prelude::*;

    fn memory_config() -> MemoryConfig {
        MemoryConfig {
            vector_store: Arc::new(InMemoryVectorStore::new()),
            metadata_store: Arc::new(InMemoryMetadataStore::new()),
            embedder: Arc::new(HashingEmbeddingProvider::new()),
            dimension_extractor: Arc::new(LexiconDimensionExtractor::new()),
            activation: ActivationConfig::default(),
            bridge: BridgeConfig::default(),
            dual_memory: DualMemoryConfig::default(),
            fusion_alpha: crate::constants::DEFAULT_FUSION_ALPHA,
        }
    }

    #[tokio::test]
    async fn store_then_recall_surfaces_the_memory_in_core() {
        let system = CognitiveMemory::with_config(memory_config());
        let stored = system
            .store(
                "transformer attention heads learn positional structure",
                StoreContext { level_hint: Some(MemoryLevel::Concept), ..Default::default() },
                None,
            )
            .await
            .unwrap();

        let result = system
            .recall("transformer attention heads learn positional structure", RecallLimits::default(), None)
            .await
            .unwrap();

        assert!(result.core.iter().any(|item| item.id == stored.memory_id));
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let system = CognitiveMemory::with_config(memory_config());
        let err = system.store("   ", StoreContext::default(), None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn delete_by_source_removes_only_matching_memories() {
        let system = CognitiveMemory::with_config(memory_config());
        system
            .store("keep", StoreContext { source_path: Some("other.md".into()), ..Default::default() }, None)
            .await
            .unwrap();
        system
            .store("drop me", StoreContext { source_path: Some("notes.md".into()), ..Default::default() }, None)
            .await
            .unwrap();

        let deleted = system.delete_by_source("notes.md").await.unwrap();
        assert_eq!(deleted, 1);

        let stats = system.stats().await.unwrap();
        let total: usize = stats.counts_by_level.values().sum();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn reconcile_removes_orphan_vector() {
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let metadata_store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        vector_store.insert(MemoryLevel::Episode, "orphan", &[1.0, 0.0], HashMap::new()).await.unwrap();

        let encoder = CognitiveEncoder::new(
            Arc::new(HashingEmbeddingProvider::with_dimension(2)),
            Arc::new(LexiconDimensionExtractor::new()),
        );
        let report = reconcile(&vector_store, &metadata_store, &encoder).await.unwrap();
        assert_eq!(report.orphan_vectors_removed, 1);
        assert!(vector_store.list_refs(MemoryLevel::Episode).await.unwrap().is_empty());
    }

    proptest! {
        /// For any non-empty stored text, the memory's `vector_ref` is
        /// exactly its `id` — the data model invariant the activation
        /// engine's seed phase relies on to recover a memory from a bare
        /// vector hit — and the fused vector lands in exactly one level's
        /// collection (the one `store` targeted).
        #[test]
        fn stored_memory_vector_ref_is_its_own_id(text in "[a-zA-Z0-9 ,.!?]{1,80}") {
            prop_assume!(!text.trim().is_empty());
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let system = CognitiveMemory::with_config(memory_config());
                let result = system.store(&text, StoreContext::default(), None).await.unwrap();

                let memory = system.metadata_store.get_memory(result.memory_id).await.unwrap().unwrap();
                prop_assert_eq!(memory.vector_ref, memory.id.to_string());

                let mut present_in = 0;
                for level in [MemoryLevel::Concept, MemoryLevel::Context, MemoryLevel::Episode] {
                    if system.vector_store.get_vector(level, &memory.vector_ref).await.unwrap().is_some() {
                        present_in += 1;
                    }
                }
                prop_assert_eq!(present_in, 1);
                Ok(())
            })?;
        }
    }
}
