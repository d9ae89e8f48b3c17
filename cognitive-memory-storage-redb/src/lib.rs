//! Embedded `redb` implementation of [`VectorStore`] and [`MetadataStore`]
//! for single-node deployments and local development that don't want a
//! networked libSQL endpoint (`SPEC_FULL.md` §1).
//!
//! Every table stores `postcard`-encoded values keyed by a plain string;
//! synchronous `redb` calls run inside `spawn_blocking` with a bounded
//! timeout, mirroring the teacher crate's `with_db_timeout` helper.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cognitive_memory_core::{
    sort_hits, BridgeCacheEntry, Connection, Error, Memory, MemoryLevel, MetadataStore, Result,
    RetrievalStat, VectorFilter, VectorHit, VectorPayload, VectorStore,
};
use redb::{Database, ReadableTable, TableDefinition};
use tracing::info;
use uuid::Uuid;

const VECTORS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("vectors");
const MEMORIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("memories");
const CONNECTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("connections");
const BRIDGE_CACHE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("bridge_cache");
const RETRIEVAL_STATS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("retrieval_stats");

const DB_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a blocking `redb` operation on the blocking pool with a fixed
/// timeout, translating join/timeout failures into [`Error::StoreUnavailable`].
async fn with_db_timeout<T, F>(operation: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(DB_OPERATION_TIMEOUT, tokio::task::spawn_blocking(operation)).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(Error::StoreUnavailable(format!("redb task join error: {join_err}"))),
        Err(_) => Err(Error::Timeout),
    }
}

fn vector_key(collection: MemoryLevel, vector_ref: &str) -> String {
    format!("{}:{vector_ref}", collection.collection_name())
}

fn connection_key(source_id: Uuid, target_id: Uuid) -> String {
    format!("{source_id}:{target_id}")
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    postcard::to_allocvec(value).map_err(|e| Error::Fatal(format!("postcard encode failed: {e}")))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    postcard::from_bytes(bytes).map_err(|e| Error::Inconsistent(format!("postcard decode failed: {e}")))
}

/// `redb`-backed [`VectorStore`] + [`MetadataStore`] pair sharing a single
/// embedded database file.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) a `redb` database at `path` and ensure every table
    /// exists.
    ///
    /// # Errors
    /// Returns [`Error::StoreUnavailable`] if the file cannot be opened.
    pub async fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "opening redb store");
        let path_buf = path.to_path_buf();
        let db = with_db_timeout(move || {
            Database::create(&path_buf)
                .map_err(|e| Error::StoreUnavailable(format!("failed to open redb database: {e}")))
        })
        .await?;

        let store = Self { db: Arc::new(db) };
        store.initialize_tables().await?;
        Ok(store)
    }

    async fn initialize_tables(&self) -> Result<()> {
        let db = self.db.clone();
        with_db_timeout(move || {
            let txn = db
                .begin_write()
                .map_err(|e| Error::StoreUnavailable(format!("begin_write failed: {e}")))?;
            {
                txn.open_table(VECTORS_TABLE)
                    .map_err(|e| Error::StoreUnavailable(format!("open vectors table: {e}")))?;
                txn.open_table(MEMORIES_TABLE)
                    .map_err(|e| Error::StoreUnavailable(format!("open memories table: {e}")))?;
                txn.open_table(CONNECTIONS_TABLE)
                    .map_err(|e| Error::StoreUnavailable(format!("open connections table: {e}")))?;
                txn.open_table(BRIDGE_CACHE_TABLE)
                    .map_err(|e| Error::StoreUnavailable(format!("open bridge_cache table: {e}")))?;
                txn.open_table(RETRIEVAL_STATS_TABLE)
                    .map_err(|e| Error::StoreUnavailable(format!("open retrieval_stats table: {e}")))?;
            }
            txn.commit().map_err(|e| Error::StoreUnavailable(format!("commit failed: {e}")))?;
            Ok(())
        })
        .await
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredVector {
    vector: Vec<f32>,
    payload: VectorPayload,
}

#[async_trait]
impl VectorStore for RedbStore {
    async fn insert(
        &self,
        collection: MemoryLevel,
        vector_ref: &str,
        vector: &[f32],
        payload: VectorPayload,
    ) -> Result<()> {
        let db = self.db.clone();
        let key = vector_key(collection, vector_ref);
        let bytes = encode(&StoredVector { vector: vector.to_vec(), payload })?;
        with_db_timeout(move || {
            let txn = db.begin_write().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            {
                let mut table = txn.open_table(VECTORS_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                table.insert(key.as_str(), bytes.as_slice()).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            }
            txn.commit().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, collection: MemoryLevel, vector_ref: &str) -> Result<()> {
        let db = self.db.clone();
        let key = vector_key(collection, vector_ref);
        with_db_timeout(move || {
            let txn = db.begin_write().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            {
                let mut table = txn.open_table(VECTORS_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                table.remove(key.as_str()).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            }
            txn.commit().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn search(
        &self,
        collection: MemoryLevel,
        query: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<VectorHit>> {
        let db = self.db.clone();
        let prefix = format!("{}:", collection.collection_name());
        let query = query.to_vec();
        let filter = filter.cloned();
        with_db_timeout(move || {
            let txn = db.begin_read().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let table = txn.open_table(VECTORS_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;

            let mut hits = Vec::new();
            for entry in table.iter().map_err(|e| Error::StoreUnavailable(e.to_string()))? {
                let (key, value) = entry.map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                let key = key.value();
                let Some(vector_ref) = key.strip_prefix(prefix.as_str()) else { continue };
                let stored: StoredVector = decode(value.value())?;

                if let Some(path) = filter.as_ref().and_then(|f| f.source_path.as_ref()) {
                    if stored.payload.get("source_path") != Some(path) {
                        continue;
                    }
                }

                let score = cognitive_memory_core::embeddings::cosine_similarity(&query, &stored.vector);
                hits.push(VectorHit { vector_ref: vector_ref.to_string(), score });
            }

            let mut hits = sort_hits(hits);
            hits.truncate(k);
            Ok(hits)
        })
        .await
    }

    async fn list_refs(&self, collection: MemoryLevel) -> Result<Vec<String>> {
        let db = self.db.clone();
        let prefix = format!("{}:", collection.collection_name());
        with_db_timeout(move || {
            let txn = db.begin_read().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let table = txn.open_table(VECTORS_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let mut refs = Vec::new();
            for entry in table.iter().map_err(|e| Error::StoreUnavailable(e.to_string()))? {
                let (key, _) = entry.map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                if let Some(vector_ref) = key.value().strip_prefix(prefix.as_str()) {
                    refs.push(vector_ref.to_string());
                }
            }
            Ok(refs)
        })
        .await
    }

    async fn get_vector(&self, collection: MemoryLevel, vector_ref: &str) -> Result<Option<Vec<f32>>> {
        let db = self.db.clone();
        let key = vector_key(collection, vector_ref);
        with_db_timeout(move || {
            let txn = db.begin_read().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let table = txn.open_table(VECTORS_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            match table.get(key.as_str()).map_err(|e| Error::StoreUnavailable(e.to_string()))? {
                Some(value) => {
                    let stored: StoredVector = decode(value.value())?;
                    Ok(Some(stored.vector))
                }
                None => Ok(None),
            }
        })
        .await
    }
}

#[async_trait]
impl MetadataStore for RedbStore {
    async fn insert_memory(&self, memory: &Memory) -> Result<()> {
        let db = self.db.clone();
        let key = memory.id.to_string();
        let bytes = encode(memory)?;
        with_db_timeout(move || {
            let txn = db.begin_write().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            {
                let mut table =
                    txn.open_table(MEMORIES_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                table.insert(key.as_str(), bytes.as_slice()).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            }
            txn.commit().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_memory(&self, id: Uuid) -> Result<Option<Memory>> {
        let db = self.db.clone();
        let key = id.to_string();
        with_db_timeout(move || {
            let txn = db.begin_read().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let table = txn.open_table(MEMORIES_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            match table.get(key.as_str()).map_err(|e| Error::StoreUnavailable(e.to_string()))? {
                Some(value) => Ok(Some(decode(value.value())?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn update_memory(&self, memory: &Memory) -> Result<()> {
        let existing = self.get_memory(memory.id).await?;
        if existing.is_none() {
            return Err(Error::NotFound(format!("memory {} not found", memory.id)));
        }
        self.insert_memory(memory).await
    }

    async fn delete_memory(&self, id: Uuid) -> Result<()> {
        let db = self.db.clone();
        let key = id.to_string();
        with_db_timeout(move || {
            let txn = db.begin_write().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            {
                let mut table =
                    txn.open_table(MEMORIES_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                table.remove(key.as_str()).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            }
            txn.commit().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn list_by_level(&self, level: MemoryLevel) -> Result<Vec<Memory>> {
        Ok(self.list_all().await?.into_iter().filter(|m| m.level == level).collect())
    }

    async fn list_by_source_path(&self, path: &str) -> Result<Vec<Memory>> {
        let path = path.to_string();
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|m| m.source_path.as_deref() == Some(path.as_str()))
            .collect())
    }

    async fn list_by_access_count(&self, max_count: u64) -> Result<Vec<Memory>> {
        let mut out: Vec<Memory> = self.list_all().await?.into_iter().filter(|m| m.access_count <= max_count).collect();
        out.sort_by_key(|m| m.access_count);
        Ok(out)
    }

    async fn list_by_access_recency(&self, levels: &[MemoryLevel]) -> Result<Vec<Memory>> {
        let levels = levels.to_vec();
        let mut out: Vec<Memory> = self.list_all().await?.into_iter().filter(|m| levels.contains(&m.level)).collect();
        out.sort_by_key(|m| m.last_accessed);
        Ok(out)
    }

    async fn list_all(&self) -> Result<Vec<Memory>> {
        let db = self.db.clone();
        with_db_timeout(move || {
            let txn = db.begin_read().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let table = txn.open_table(MEMORIES_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let mut memories = Vec::new();
            for entry in table.iter().map_err(|e| Error::StoreUnavailable(e.to_string()))? {
                let (_, value) = entry.map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                memories.push(decode(value.value())?);
            }
            Ok(memories)
        })
        .await
    }

    async fn upsert_connection(&self, connection: &Connection) -> Result<()> {
        let db = self.db.clone();
        let key = connection_key(connection.source_id, connection.target_id);
        let bytes = encode(connection)?;
        with_db_timeout(move || {
            let txn = db.begin_write().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            {
                let mut table =
                    txn.open_table(CONNECTIONS_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                table.insert(key.as_str(), bytes.as_slice()).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            }
            txn.commit().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_connection(&self, source_id: Uuid, target_id: Uuid) -> Result<Option<Connection>> {
        let db = self.db.clone();
        let key = connection_key(source_id, target_id);
        with_db_timeout(move || {
            let txn = db.begin_read().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let table =
                txn.open_table(CONNECTIONS_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            match table.get(key.as_str()).map_err(|e| Error::StoreUnavailable(e.to_string()))? {
                Some(value) => Ok(Some(decode(value.value())?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn outgoing_connections(&self, source_id: Uuid) -> Result<Vec<Connection>> {
        let db = self.db.clone();
        let prefix = format!("{source_id}:");
        with_db_timeout(move || {
            let txn = db.begin_read().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let table =
                txn.open_table(CONNECTIONS_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let mut out = Vec::new();
            for entry in table.iter().map_err(|e| Error::StoreUnavailable(e.to_string()))? {
                let (key, value) = entry.map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                if key.value().starts_with(prefix.as_str()) {
                    out.push(decode(value.value())?);
                }
            }
            Ok(out)
        })
        .await
    }

    async fn connections_above_strength(&self, source_id: Uuid, min_strength: f32) -> Result<Vec<Connection>> {
        Ok(self
            .outgoing_connections(source_id)
            .await?
            .into_iter()
            .filter(|c| c.strength >= min_strength)
            .collect())
    }

    async fn get_bridge_cache(&self, fingerprint: &str) -> Result<Vec<BridgeCacheEntry>> {
        let db = self.db.clone();
        let key = fingerprint.to_string();
        with_db_timeout(move || {
            let txn = db.begin_read().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let table =
                txn.open_table(BRIDGE_CACHE_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            match table.get(key.as_str()).map_err(|e| Error::StoreUnavailable(e.to_string()))? {
                Some(value) => Ok(decode(value.value())?),
                None => Ok(Vec::new()),
            }
        })
        .await
    }

    async fn put_bridge_cache(&self, fingerprint: &str, entries: Vec<BridgeCacheEntry>) -> Result<()> {
        let db = self.db.clone();
        let key = fingerprint.to_string();
        let bytes = encode(&entries)?;
        with_db_timeout(move || {
            let txn = db.begin_write().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            {
                let mut table =
                    txn.open_table(BRIDGE_CACHE_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                table.insert(key.as_str(), bytes.as_slice()).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            }
            txn.commit().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn evict_expired_bridge_cache(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> Result<u64> {
        let db = self.db.clone();
        with_db_timeout(move || {
            let txn = db.begin_write().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            let mut evicted = 0u64;
            {
                let mut table =
                    txn.open_table(BRIDGE_CACHE_TABLE).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                let stale: Vec<String> = table
                    .iter()
                    .map_err(|e| Error::StoreUnavailable(e.to_string()))?
                    .filter_map(|entry| {
                        let (key, value) = entry.ok()?;
                        let entries: Vec<BridgeCacheEntry> = decode(value.value()).ok()?;
                        let fresh = entries.first().map(|e| now - e.created_at < ttl).unwrap_or(false);
                        (!fresh).then(|| key.value().to_string())
                    })
                    .collect();
                for key in stale {
                    table.remove(key.as_str()).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                    evicted += 1;
                }
            }
            txn.commit().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            Ok(evicted)
        })
        .await
    }

    async fn append_retrieval_stat(&self, stat: &RetrievalStat) -> Result<()> {
        let db = self.db.clone();
        let key = format!("{}:{}", stat.timestamp.timestamp_nanos_opt().unwrap_or_default(), stat.memory_id);
        let bytes = encode(stat)?;
        with_db_timeout(move || {
            let txn = db.begin_write().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            {
                let mut table = txn
                    .open_table(RETRIEVAL_STATS_TABLE)
                    .map_err(|e| Error::StoreUnavailable(e.to_string()))?;
                table.insert(key.as_str(), bytes.as_slice()).map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            }
            txn.commit().map_err(|e| Error::StoreUnavailable(e.to_string()))?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    async fn temp_store() -> (RedbStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(&dir.path().join("test.redb")).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn insert_then_search_round_trips_the_nearest_vector() {
        let (store, _dir) = temp_store().await;
        store.insert(MemoryLevel::Episode, "a", &[1.0, 0.0], StdHashMap::new()).await.unwrap();
        store.insert(MemoryLevel::Episode, "b", &[0.0, 1.0], StdHashMap::new()).await.unwrap();

        let hits = store.search(MemoryLevel::Episode, &[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].vector_ref, "a");
    }

    #[tokio::test]
    async fn memory_round_trips_through_insert_get_delete() {
        let (store, _dir) = temp_store().await;
        let memory = Memory::new(MemoryLevel::Concept, "hello".into(), StdHashMap::new(), "v1".into());
        store.insert_memory(&memory).await.unwrap();

        let fetched = store.get_memory(memory.id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "hello");

        store.delete_memory(memory.id).await.unwrap();
        assert!(store.get_memory(memory.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_memory_is_not_found() {
        let (store, _dir) = temp_store().await;
        let memory = Memory::new(MemoryLevel::Episode, "x".into(), StdHashMap::new(), "v1".into());
        let err = store.update_memory(&memory).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn connections_above_strength_filters_correctly() {
        let (store, _dir) = temp_store().await;
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        store
            .upsert_connection(&Connection::new(a, b, 0.8, cognitive_memory_core::ConnectionKind::Associative))
            .await
            .unwrap();
        store
            .upsert_connection(&Connection::new(a, c, 0.2, cognitive_memory_core::ConnectionKind::Associative))
            .await
            .unwrap();

        let strong = store.connections_above_strength(a, 0.5).await.unwrap();
        assert_eq!(strong.len(), 1);
        assert_eq!(strong[0].target_id, b);
    }
}
