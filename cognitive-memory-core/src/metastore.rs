//! The [`MetadataStore`] trait: source of truth for [`Memory`] rows, the
//! associative [`Connection`] graph, the bridge cache, and the retrieval
//! stat log (`SPEC_FULL.md` §4.5). Composite-key connection inserts are
//! upserts, matching the reinforcement formula in §4.5.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Connection, Memory, MemoryLevel, RetrievalStat};

/// A cached bridge-discovery result, keyed by `(query_fingerprint, memory_id)`.
#[derive(Debug, Clone)]
pub struct BridgeCacheEntry {
    /// Fingerprint of the query plus its retrieval parameters.
    pub query_fingerprint: String,
    /// The bridged memory.
    pub memory_id: Uuid,
    /// `0.6*novelty + 0.4*cp`.
    pub bridge_score: f32,
    /// `1 - cosine(query, candidate)`.
    pub novelty_score: f32,
    /// `max(max_sim, max_edge_strength)`.
    pub connection_potential: f32,
    /// When this entry was written.
    pub created_at: DateTime<Utc>,
}

/// Source of truth for all non-vector state.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a brand-new memory row.
    async fn insert_memory(&self, memory: &Memory) -> Result<()>;

    /// Fetch a memory by id.
    async fn get_memory(&self, id: Uuid) -> Result<Option<Memory>>;

    /// Replace a memory row (used after access/importance/promotion updates).
    async fn update_memory(&self, memory: &Memory) -> Result<()>;

    /// Delete a memory row. Idempotent.
    async fn delete_memory(&self, id: Uuid) -> Result<()>;

    /// All memories at a given hierarchy level.
    async fn list_by_level(&self, level: MemoryLevel) -> Result<Vec<Memory>>;

    /// All memories whose `source_path` equals `path` exactly.
    async fn list_by_source_path(&self, path: &str) -> Result<Vec<Memory>>;

    /// Memories ordered by ascending `access_count` (used by eviction scans).
    async fn list_by_access_count(&self, max_count: u64) -> Result<Vec<Memory>>;

    /// Memories ordered by descending staleness (ascending `last_accessed`),
    /// used to weight bridge candidate sampling towards stale content.
    async fn list_by_access_recency(&self, levels: &[MemoryLevel]) -> Result<Vec<Memory>>;

    /// Every memory in the store (used by startup reconciliation and tests).
    async fn list_all(&self) -> Result<Vec<Memory>>;

    /// Upsert a connection: if `(source_id, target_id)` already exists its
    /// strength/activation stats are updated in place, otherwise a new row
    /// is created.
    async fn upsert_connection(&self, connection: &Connection) -> Result<()>;

    /// Fetch a single edge.
    async fn get_connection(&self, source_id: Uuid, target_id: Uuid) -> Result<Option<Connection>>;

    /// All outgoing edges from `source_id`.
    async fn outgoing_connections(&self, source_id: Uuid) -> Result<Vec<Connection>>;

    /// All edges with `strength >= min_strength`, used by promotion's
    /// "≥2 outgoing edges of strength ≥0.5" rule.
    async fn connections_above_strength(&self, source_id: Uuid, min_strength: f32) -> Result<Vec<Connection>>;

    /// Read a cached bridge result, or `None` on cache miss / expiry.
    async fn get_bridge_cache(&self, fingerprint: &str) -> Result<Vec<BridgeCacheEntry>>;

    /// Write bridge results for a fingerprint, replacing any prior entries.
    async fn put_bridge_cache(&self, fingerprint: &str, entries: Vec<BridgeCacheEntry>) -> Result<()>;

    /// Evict bridge cache entries older than `ttl` as of `now`.
    async fn evict_expired_bridge_cache(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> Result<u64>;

    /// Append a retrieval stat log line.
    async fn append_retrieval_stat(&self, stat: &RetrievalStat) -> Result<()>;
}
