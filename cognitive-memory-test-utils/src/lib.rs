//! In-memory [`VectorStore`]/[`MetadataStore`] fixtures for testing the
//! cognitive memory engine, plus a handful of memory-builder helpers.
//! Mirrors the shape of the teacher's `mock_model.rs`: deterministic,
//! side-effect-free stand-ins, not meant for production use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cognitive_memory_core::embeddings::cosine_similarity;
use cognitive_memory_core::{
    sort_hits, BridgeCacheEntry, Connection, Error, Memory, MemoryLevel, MetadataStore, Result,
    RetrievalStat, VectorFilter, VectorHit, VectorPayload, VectorStore,
};
use parking_lot::RwLock;
use uuid::Uuid;

/// In-memory [`VectorStore`]: one `HashMap` per [`MemoryLevel`] collection,
/// scored by brute-force cosine similarity.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<MemoryLevel, HashMap<String, (Vec<f32>, VectorPayload)>>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn insert(
        &self,
        collection: MemoryLevel,
        vector_ref: &str,
        vector: &[f32],
        payload: VectorPayload,
    ) -> Result<()> {
        self.collections
            .write()
            .entry(collection)
            .or_default()
            .insert(vector_ref.to_string(), (vector.to_vec(), payload));
        Ok(())
    }

    async fn delete(&self, collection: MemoryLevel, vector_ref: &str) -> Result<()> {
        if let Some(table) = self.collections.write().get_mut(&collection) {
            table.remove(vector_ref);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: MemoryLevel,
        query: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<VectorHit>> {
        let guard = self.collections.read();
        let Some(table) = guard.get(&collection) else {
            return Ok(Vec::new());
        };

        let hits: Vec<VectorHit> = table
            .iter()
            .filter(|(_, (_, payload))| match filter.and_then(|f| f.source_path.as_ref()) {
                Some(path) => payload.get("source_path").map(|p| p == path).unwrap_or(false),
                None => true,
            })
            .map(|(vector_ref, (vector, _))| VectorHit {
                vector_ref: vector_ref.clone(),
                score: cosine_similarity(query, vector),
            })
            .collect();

        let mut hits = sort_hits(hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn list_refs(&self, collection: MemoryLevel) -> Result<Vec<String>> {
        Ok(self
            .collections
            .read()
            .get(&collection)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_vector(&self, collection: MemoryLevel, vector_ref: &str) -> Result<Option<Vec<f32>>> {
        Ok(self
            .collections
            .read()
            .get(&collection)
            .and_then(|table| table.get(vector_ref))
            .map(|(vector, _)| vector.clone()))
    }
}

#[derive(Default)]
struct MetadataState {
    memories: HashMap<Uuid, Memory>,
    connections: HashMap<(Uuid, Uuid), Connection>,
    bridge_cache: HashMap<String, Vec<BridgeCacheEntry>>,
    retrieval_stats: Vec<RetrievalStat>,
}

/// In-memory [`MetadataStore`]: a single `RwLock`-guarded table per
/// concern, scanned linearly. Fine for unit tests; not contention-tuned.
pub struct InMemoryMetadataStore {
    state: RwLock<MetadataState>,
    stat_sequence: AtomicU64,
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self { state: RwLock::new(MetadataState::default()), stat_sequence: AtomicU64::new(0) }
    }
}

impl InMemoryMetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total retrieval stats appended so far, useful in tests asserting
    /// on the append-only log without reaching into the store directly.
    #[must_use]
    pub fn retrieval_stat_count(&self) -> u64 {
        self.stat_sequence.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn insert_memory(&self, memory: &Memory) -> Result<()> {
        self.state.write().memories.insert(memory.id, memory.clone());
        Ok(())
    }

    async fn get_memory(&self, id: Uuid) -> Result<Option<Memory>> {
        Ok(self.state.read().memories.get(&id).cloned())
    }

    async fn update_memory(&self, memory: &Memory) -> Result<()> {
        let mut state = self.state.write();
        if !state.memories.contains_key(&memory.id) {
            return Err(Error::NotFound(format!("memory {} not found", memory.id)));
        }
        state.memories.insert(memory.id, memory.clone());
        Ok(())
    }

    async fn delete_memory(&self, id: Uuid) -> Result<()> {
        self.state.write().memories.remove(&id);
        Ok(())
    }

    async fn list_by_level(&self, level: MemoryLevel) -> Result<Vec<Memory>> {
        Ok(self.state.read().memories.values().filter(|m| m.level == level).cloned().collect())
    }

    async fn list_by_source_path(&self, path: &str) -> Result<Vec<Memory>> {
        Ok(self
            .state
            .read()
            .memories
            .values()
            .filter(|m| m.source_path.as_deref() == Some(path))
            .cloned()
            .collect())
    }

    async fn list_by_access_count(&self, max_count: u64) -> Result<Vec<Memory>> {
        let mut out: Vec<Memory> =
            self.state.read().memories.values().filter(|m| m.access_count <= max_count).cloned().collect();
        out.sort_by_key(|m| m.access_count);
        Ok(out)
    }

    async fn list_by_access_recency(&self, levels: &[MemoryLevel]) -> Result<Vec<Memory>> {
        let mut out: Vec<Memory> =
            self.state.read().memories.values().filter(|m| levels.contains(&m.level)).cloned().collect();
        out.sort_by_key(|m| m.last_accessed);
        Ok(out)
    }

    async fn list_all(&self) -> Result<Vec<Memory>> {
        Ok(self.state.read().memories.values().cloned().collect())
    }

    async fn upsert_connection(&self, connection: &Connection) -> Result<()> {
        self.state
            .write()
            .connections
            .insert((connection.source_id, connection.target_id), connection.clone());
        Ok(())
    }

    async fn get_connection(&self, source_id: Uuid, target_id: Uuid) -> Result<Option<Connection>> {
        Ok(self.state.read().connections.get(&(source_id, target_id)).cloned())
    }

    async fn outgoing_connections(&self, source_id: Uuid) -> Result<Vec<Connection>> {
        Ok(self
            .state
            .read()
            .connections
            .values()
            .filter(|c| c.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn connections_above_strength(&self, source_id: Uuid, min_strength: f32) -> Result<Vec<Connection>> {
        Ok(self
            .state
            .read()
            .connections
            .values()
            .filter(|c| c.source_id == source_id && c.strength >= min_strength)
            .cloned()
            .collect())
    }

    async fn get_bridge_cache(&self, fingerprint: &str) -> Result<Vec<BridgeCacheEntry>> {
        Ok(self.state.read().bridge_cache.get(fingerprint).cloned().unwrap_or_default())
    }

    async fn put_bridge_cache(&self, fingerprint: &str, entries: Vec<BridgeCacheEntry>) -> Result<()> {
        self.state.write().bridge_cache.insert(fingerprint.to_string(), entries);
        Ok(())
    }

    async fn evict_expired_bridge_cache(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> Result<u64> {
        let mut state = self.state.write();
        let mut evicted = 0u64;
        state.bridge_cache.retain(|_, entries| {
            let fresh = entries.first().map(|e| now - e.created_at < ttl).unwrap_or(false);
            if !fresh {
                evicted += 1;
            }
            fresh
        });
        Ok(evicted)
    }

    async fn append_retrieval_stat(&self, stat: &RetrievalStat) -> Result<()> {
        self.state.write().retrieval_stats.push(stat.clone());
        self.stat_sequence.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Build an episodic [`Memory`] at `level` with `content`, no dimensions,
/// and a vector ref derived from a fresh UUID — handy when a test only
/// cares about metadata-store behavior and not the dimension vector.
#[must_use]
pub fn test_memory(level: MemoryLevel, content: &str) -> Memory {
    Memory::new(level, content.to_string(), HashMap::new(), Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_search_finds_the_nearest_vector() {
        let store = InMemoryVectorStore::new();
        store.insert(MemoryLevel::Episode, "a", &[1.0, 0.0], HashMap::new()).await.unwrap();
        store.insert(MemoryLevel::Episode, "b", &[0.0, 1.0], HashMap::new()).await.unwrap();

        let hits = store.search(MemoryLevel::Episode, &[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].vector_ref, "a");
    }

    #[tokio::test]
    async fn delete_then_list_refs_is_idempotent() {
        let store = InMemoryVectorStore::new();
        store.insert(MemoryLevel::Concept, "a", &[1.0], HashMap::new()).await.unwrap();
        store.delete(MemoryLevel::Concept, "a").await.unwrap();
        store.delete(MemoryLevel::Concept, "a").await.unwrap();
        assert!(store.list_refs(MemoryLevel::Concept).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_respects_source_path_filter() {
        let store = InMemoryVectorStore::new();
        let mut payload_a = HashMap::new();
        payload_a.insert("source_path".to_string(), "notes/a.md".to_string());
        store.insert(MemoryLevel::Episode, "a", &[1.0, 0.0], payload_a).await.unwrap();
        store.insert(MemoryLevel::Episode, "b", &[1.0, 0.0], HashMap::new()).await.unwrap();

        let filter = VectorFilter { source_path: Some("notes/a.md".to_string()) };
        let hits = store.search(MemoryLevel::Episode, &[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].vector_ref, "a");
    }

    #[tokio::test]
    async fn update_missing_memory_is_not_found() {
        let store = InMemoryMetadataStore::new();
        let memory = test_memory(MemoryLevel::Episode, "x");
        let err = store.update_memory(&memory).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn upsert_connection_overwrites_existing_edge() {
        let store = InMemoryMetadataStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut conn = Connection::new(a, b, 0.2, cognitive_memory_core::ConnectionKind::Associative);
        store.upsert_connection(&conn).await.unwrap();
        conn.strength = 0.9;
        store.upsert_connection(&conn).await.unwrap();

        let fetched = store.get_connection(a, b).await.unwrap().unwrap();
        assert!((fetched.strength - 0.9).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn bridge_cache_eviction_drops_only_stale_entries() {
        let store = InMemoryMetadataStore::new();
        let now = Utc::now();
        let fresh_entry = BridgeCacheEntry {
            query_fingerprint: "fresh".into(),
            memory_id: Uuid::new_v4(),
            bridge_score: 0.5,
            novelty_score: 0.5,
            connection_potential: 0.5,
            created_at: now,
        };
        let mut stale_entry = fresh_entry.clone();
        stale_entry.query_fingerprint = "stale".into();
        stale_entry.created_at = now - chrono::Duration::minutes(10);

        store.put_bridge_cache("fresh", vec![fresh_entry]).await.unwrap();
        store.put_bridge_cache("stale", vec![stale_entry]).await.unwrap();

        let evicted = store.evict_expired_bridge_cache(now, chrono::Duration::minutes(5)).await.unwrap();
        assert_eq!(evicted, 1);
        assert_eq!(store.get_bridge_cache("fresh").await.unwrap().len(), 1);
        assert!(store.get_bridge_cache("stale").await.unwrap().is_empty());
    }
}
