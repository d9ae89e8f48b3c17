//! `libSQL`/Turso implementation of [`VectorStore`] and [`MetadataStore`]
//! for networked deployments (`SPEC_FULL.md` §1, §6). Lays out the
//! "relational schema" persisted state explicitly: tables `memories`,
//! `memory_connections`, `bridge_cache`, `retrieval_stats`, with indices on
//! `level`, `created_at`, `access_count`, `connection_strength`, and a
//! functional index on `source_path`. Vectors live in their own `vectors`
//! table keyed by collection; search scores every row with cosine
//! similarity, since `libSQL` has no native vector index, mirroring the
//! `cognitive-memory-storage-redb` crate's application-side scoring over a
//! blob column.
//!
//! Transient libSQL failures are retried through [`RetryPolicy`]
//! (`SPEC_FULL.md` §4.4's bounded exponential backoff).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cognitive_memory_core::embeddings::cosine_similarity;
use cognitive_memory_core::{
    sort_hits, BridgeCacheEntry, CircuitBreaker, CircuitBreakerConfig, Connection, ConnectionKind,
    Error, Memory, MemoryLevel, MemoryType, MetadataStore, Result, RetrievalKind, RetrievalStat,
    RetryConfig, RetryPolicy, Retryable, VectorFilter, VectorHit, VectorPayload, VectorStore,
};
use libsql::{Builder, Database};
use tracing::info;
use uuid::Uuid;

/// Wraps [`Error`] so it can flow through [`RetryPolicy::execute`], which is
/// generic over any `Retryable + Debug` error.
#[derive(Debug)]
struct StoreError(Error);

impl Retryable for StoreError {
    fn is_recoverable(&self) -> bool {
        self.0.is_recoverable()
    }
}

fn store_err(err: impl std::fmt::Display) -> Error {
    Error::StoreUnavailable(err.to_string())
}

const MEMORY_COLUMNS: &str = "id, level, content, dimensions, vector_ref, created_at, last_accessed, \
     access_count, importance_score, parent_id, memory_type, decay_rate, source_path";

/// `libSQL`-backed [`VectorStore`] + [`MetadataStore`] pair, suitable for a
/// local `file:` database or a remote `libsql://` endpoint.
pub struct TursoStore {
    db: Arc<Database>,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl TursoStore {
    /// Open a local file-backed database (or `:memory:`) and ensure the
    /// schema exists.
    ///
    /// # Errors
    /// Returns [`Error::StoreUnavailable`] if the database cannot be opened.
    pub async fn open_local(path: &str) -> Result<Self> {
        info!(%path, "opening local libsql store");
        let db = Builder::new_local(path).build().await.map_err(store_err)?;
        let store = Self {
            db: Arc::new(db),
            retry: RetryPolicy::default(),
            breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Connect to a remote Turso endpoint over `libsql://` and ensure the
    /// schema exists.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] if `url` is not a `libsql://` URL, or
    /// [`Error::StoreUnavailable`] if the connection cannot be established.
    pub async fn connect_remote(url: &str, token: &str) -> Result<Self> {
        if !url.starts_with("libsql://") {
            return Err(Error::Validation(format!("remote turso url must use libsql://, got {url}")));
        }
        info!(%url, "connecting to remote libsql store");
        let db = Builder::new_remote(url.to_string(), token.to_string())
            .build()
            .await
            .map_err(store_err)?;
        let store = Self {
            db: Arc::new(db),
            retry: RetryPolicy::with_config(RetryConfig::default()),
            breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.db.connect().map_err(store_err)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vectors (
                collection TEXT NOT NULL,
                vector_ref TEXT NOT NULL,
                vector BLOB NOT NULL,
                source_path TEXT,
                PRIMARY KEY (collection, vector_ref)
            );
            CREATE INDEX IF NOT EXISTS idx_vectors_source_path ON vectors(source_path);

            CREATE TABLE IF NOT EXISTS memories (
                id TEXT PRIMARY KEY,
                level INTEGER NOT NULL,
                content TEXT NOT NULL,
                dimensions TEXT NOT NULL,
                vector_ref TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_accessed TEXT NOT NULL,
                access_count INTEGER NOT NULL,
                importance_score REAL NOT NULL,
                parent_id TEXT,
                memory_type TEXT NOT NULL,
                decay_rate REAL NOT NULL,
                source_path TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_memories_level ON memories(level);
            CREATE INDEX IF NOT EXISTS idx_memories_created_at ON memories(created_at);
            CREATE INDEX IF NOT EXISTS idx_memories_access_count ON memories(access_count);
            CREATE INDEX IF NOT EXISTS idx_memories_source_path ON memories(source_path);

            CREATE TABLE IF NOT EXISTS memory_connections (
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                strength REAL NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_activated TEXT NOT NULL,
                activation_count INTEGER NOT NULL,
                PRIMARY KEY (source_id, target_id)
            );
            CREATE INDEX IF NOT EXISTS idx_connections_strength ON memory_connections(strength);

            CREATE TABLE IF NOT EXISTS bridge_cache (
                query_fingerprint TEXT NOT NULL,
                memory_id TEXT NOT NULL,
                bridge_score REAL NOT NULL,
                novelty_score REAL NOT NULL,
                connection_potential REAL NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (query_fingerprint, memory_id)
            );

            CREATE TABLE IF NOT EXISTS retrieval_stats (
                query_fingerprint TEXT NOT NULL,
                memory_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                success_score REAL,
                timestamp TEXT NOT NULL
            );",
        )
        .await
        .map_err(store_err)?;
        Ok(())
    }

    /// Runs `operation` under both the circuit breaker (fails fast once the
    /// backend is observed to be down) and the retry policy (rides out
    /// isolated transient failures while the circuit is closed).
    async fn with_retry<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        self.breaker
            .call(|| async {
                self.retry.execute(|| async { operation().await.map_err(StoreError) }).await.map_err(|StoreError(e)| e)
            })
            .await
    }
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Inconsistent(format!("bad timestamp {raw}: {e}")))
}

fn connection_kind_str(kind: ConnectionKind) -> &'static str {
    match kind {
        ConnectionKind::Associative => "associative",
        ConnectionKind::Hierarchical => "hierarchical",
        ConnectionKind::Temporal => "temporal",
        ConnectionKind::Causal => "causal",
    }
}

fn parse_connection_kind(raw: &str) -> Result<ConnectionKind> {
    match raw {
        "associative" => Ok(ConnectionKind::Associative),
        "hierarchical" => Ok(ConnectionKind::Hierarchical),
        "temporal" => Ok(ConnectionKind::Temporal),
        "causal" => Ok(ConnectionKind::Causal),
        other => Err(Error::Inconsistent(format!("unknown connection kind {other}"))),
    }
}

fn retrieval_kind_str(kind: RetrievalKind) -> &'static str {
    match kind {
        RetrievalKind::Core => "core",
        RetrievalKind::Peripheral => "peripheral",
        RetrievalKind::Bridge => "bridge",
    }
}

fn memory_type_str(t: MemoryType) -> &'static str {
    match t {
        MemoryType::Episodic => "episodic",
        MemoryType::Semantic => "semantic",
    }
}

fn parse_memory_type(raw: &str) -> Result<MemoryType> {
    match raw {
        "episodic" => Ok(MemoryType::Episodic),
        "semantic" => Ok(MemoryType::Semantic),
        other => Err(Error::Inconsistent(format!("unknown memory type {other}"))),
    }
}

fn level_to_i64(level: MemoryLevel) -> i64 {
    match level {
        MemoryLevel::Concept => 0,
        MemoryLevel::Context => 1,
        MemoryLevel::Episode => 2,
    }
}

fn level_from_i64(raw: i64) -> Result<MemoryLevel> {
    match raw {
        0 => Ok(MemoryLevel::Concept),
        1 => Ok(MemoryLevel::Context),
        2 => Ok(MemoryLevel::Episode),
        other => Err(Error::Inconsistent(format!("unknown memory level {other}"))),
    }
}

fn row_to_memory(row: &libsql::Row) -> Result<Memory> {
    let dimensions_json: String = row.get(3).map_err(store_err)?;
    let dimensions = serde_json::from_str(&dimensions_json)?;
    let parent_id: Option<String> = row.get(9).map_err(store_err)?;
    let source_path: Option<String> = row.get(12).map_err(store_err)?;

    Ok(Memory {
        id: Uuid::parse_str(&row.get::<String>(0).map_err(store_err)?)
            .map_err(|e| Error::Inconsistent(e.to_string()))?,
        level: level_from_i64(row.get(1).map_err(store_err)?)?,
        content: row.get(2).map_err(store_err)?,
        dimensions,
        vector_ref: row.get(4).map_err(store_err)?,
        created_at: parse_ts(&row.get::<String>(5).map_err(store_err)?)?,
        last_accessed: parse_ts(&row.get::<String>(6).map_err(store_err)?)?,
        access_count: row.get::<i64>(7).map_err(store_err)? as u64,
        importance_score: row.get::<f64>(8).map_err(store_err)? as f32,
        parent_id: parent_id
            .map(|p| Uuid::parse_str(&p).map_err(|e| Error::Inconsistent(e.to_string())))
            .transpose()?,
        memory_type: parse_memory_type(&row.get::<String>(10).map_err(store_err)?)?,
        decay_rate: row.get::<f64>(11).map_err(store_err)? as f32,
        source_path,
    })
}

fn row_to_connection(row: &libsql::Row) -> Result<Connection> {
    Ok(Connection {
        source_id: Uuid::parse_str(&row.get::<String>(0).map_err(store_err)?)
            .map_err(|e| Error::Inconsistent(e.to_string()))?,
        target_id: Uuid::parse_str(&row.get::<String>(1).map_err(store_err)?)
            .map_err(|e| Error::Inconsistent(e.to_string()))?,
        strength: row.get::<f64>(2).map_err(store_err)? as f32,
        kind: parse_connection_kind(&row.get::<String>(3).map_err(store_err)?)?,
        created_at: parse_ts(&row.get::<String>(4).map_err(store_err)?)?,
        last_activated: parse_ts(&row.get::<String>(5).map_err(store_err)?)?,
        activation_count: row.get::<i64>(6).map_err(store_err)? as u64,
    })
}

fn postcard_encode(vector: &[f32]) -> Result<Vec<u8>> {
    postcard::to_allocvec(vector).map_err(|e| Error::Fatal(format!("postcard encode failed: {e}")))
}

fn postcard_decode(bytes: &[u8]) -> Result<Vec<f32>> {
    postcard::from_bytes(bytes).map_err(|e| Error::Inconsistent(format!("postcard decode failed: {e}")))
}

#[async_trait]
impl VectorStore for TursoStore {
    async fn insert(
        &self,
        collection: MemoryLevel,
        vector_ref: &str,
        vector: &[f32],
        payload: VectorPayload,
    ) -> Result<()> {
        let bytes = postcard_encode(vector)?;
        let source_path = payload.get("source_path").cloned();
        let collection_name = collection.collection_name().to_string();
        let vector_ref = vector_ref.to_string();
        self.with_retry(|| {
            let db = self.db.clone();
            let collection_name = collection_name.clone();
            let vector_ref = vector_ref.clone();
            let bytes = bytes.clone();
            let source_path = source_path.clone();
            async move {
                let conn = db.connect().map_err(store_err)?;
                conn.execute(
                    "INSERT OR REPLACE INTO vectors (collection, vector_ref, vector, source_path) \
                     VALUES (?1, ?2, ?3, ?4)",
                    libsql::params![collection_name, vector_ref, bytes, source_path],
                )
                .await
                .map_err(store_err)?;
                Ok(())
            }
        })
        .await
    }

    async fn delete(&self, collection: MemoryLevel, vector_ref: &str) -> Result<()> {
        let conn = self.db.connect().map_err(store_err)?;
        conn.execute(
            "DELETE FROM vectors WHERE collection = ?1 AND vector_ref = ?2",
            libsql::params![collection.collection_name(), vector_ref],
        )
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn search(
        &self,
        collection: MemoryLevel,
        query: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<VectorHit>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                "SELECT vector_ref, vector, source_path FROM vectors WHERE collection = ?1",
                libsql::params![collection.collection_name()],
            )
            .await
            .map_err(store_err)?;

        let mut hits = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let source_path: Option<String> = row.get(2).map_err(store_err)?;
            if let Some(wanted) = filter.and_then(|f| f.source_path.as_ref()) {
                if source_path.as_deref() != Some(wanted.as_str()) {
                    continue;
                }
            }
            let vector_ref: String = row.get(0).map_err(store_err)?;
            let bytes: Vec<u8> = row.get(1).map_err(store_err)?;
            let vector: Vec<f32> = postcard_decode(&bytes)?;
            let score = cosine_similarity(query, &vector);
            hits.push(VectorHit { vector_ref, score });
        }

        let mut hits = sort_hits(hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn list_refs(&self, collection: MemoryLevel) -> Result<Vec<String>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                "SELECT vector_ref FROM vectors WHERE collection = ?1",
                libsql::params![collection.collection_name()],
            )
            .await
            .map_err(store_err)?;
        let mut refs = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            refs.push(row.get::<String>(0).map_err(store_err)?);
        }
        Ok(refs)
    }

    async fn get_vector(&self, collection: MemoryLevel, vector_ref: &str) -> Result<Option<Vec<f32>>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                "SELECT vector FROM vectors WHERE collection = ?1 AND vector_ref = ?2",
                libsql::params![collection.collection_name(), vector_ref],
            )
            .await
            .map_err(store_err)?;
        match rows.next().await.map_err(store_err)? {
            Some(row) => {
                let bytes: Vec<u8> = row.get(0).map_err(store_err)?;
                Ok(Some(postcard_decode(&bytes)?))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MetadataStore for TursoStore {
    async fn insert_memory(&self, memory: &Memory) -> Result<()> {
        let conn = self.db.connect().map_err(store_err)?;
        let dimensions_json = serde_json::to_string(&memory.dimensions)?;
        conn.execute(
            &format!(
                "INSERT INTO memories ({MEMORY_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)"
            ),
            libsql::params![
                memory.id.to_string(),
                level_to_i64(memory.level),
                memory.content.clone(),
                dimensions_json,
                memory.vector_ref.clone(),
                fmt_ts(memory.created_at),
                fmt_ts(memory.last_accessed),
                memory.access_count as i64,
                f64::from(memory.importance_score),
                memory.parent_id.map(|p| p.to_string()),
                memory_type_str(memory.memory_type),
                f64::from(memory.decay_rate),
                memory.source_path.clone(),
            ],
        )
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_memory(&self, id: Uuid) -> Result<Option<Memory>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
                libsql::params![id.to_string()],
            )
            .await
            .map_err(store_err)?;
        match rows.next().await.map_err(store_err)? {
            Some(row) => Ok(Some(row_to_memory(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_memory(&self, memory: &Memory) -> Result<()> {
        if self.get_memory(memory.id).await?.is_none() {
            return Err(Error::NotFound(format!("memory {} not found", memory.id)));
        }
        let conn = self.db.connect().map_err(store_err)?;
        let dimensions_json = serde_json::to_string(&memory.dimensions)?;
        conn.execute(
            "UPDATE memories SET level=?2, content=?3, dimensions=?4, vector_ref=?5, created_at=?6, \
             last_accessed=?7, access_count=?8, importance_score=?9, parent_id=?10, memory_type=?11, \
             decay_rate=?12, source_path=?13 WHERE id=?1",
            libsql::params![
                memory.id.to_string(),
                level_to_i64(memory.level),
                memory.content.clone(),
                dimensions_json,
                memory.vector_ref.clone(),
                fmt_ts(memory.created_at),
                fmt_ts(memory.last_accessed),
                memory.access_count as i64,
                f64::from(memory.importance_score),
                memory.parent_id.map(|p| p.to_string()),
                memory_type_str(memory.memory_type),
                f64::from(memory.decay_rate),
                memory.source_path.clone(),
            ],
        )
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn delete_memory(&self, id: Uuid) -> Result<()> {
        let conn = self.db.connect().map_err(store_err)?;
        conn.execute("DELETE FROM memories WHERE id = ?1", libsql::params![id.to_string()])
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn list_by_level(&self, level: MemoryLevel) -> Result<Vec<Memory>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE level = ?1"),
                libsql::params![level_to_i64(level)],
            )
            .await
            .map_err(store_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            out.push(row_to_memory(&row)?);
        }
        Ok(out)
    }

    async fn list_by_source_path(&self, path: &str) -> Result<Vec<Memory>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE source_path = ?1"),
                libsql::params![path],
            )
            .await
            .map_err(store_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            out.push(row_to_memory(&row)?);
        }
        Ok(out)
    }

    async fn list_by_access_count(&self, max_count: u64) -> Result<Vec<Memory>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                "SELECT id, level, content, dimensions, vector_ref, created_at, last_accessed, \
                 access_count, importance_score, parent_id, memory_type, decay_rate, source_path \
                 FROM memories WHERE access_count <= ?1 ORDER BY access_count ASC",
                libsql::params![max_count as i64],
            )
            .await
            .map_err(store_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            out.push(row_to_memory(&row)?);
        }
        Ok(out)
    }

    async fn list_by_access_recency(&self, levels: &[MemoryLevel]) -> Result<Vec<Memory>> {
        let conn = self.db.connect().map_err(store_err)?;
        let placeholders: Vec<String> = (1..=levels.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT {MEMORY_COLUMNS} FROM memories WHERE level IN ({}) ORDER BY last_accessed ASC",
            placeholders.join(",")
        );
        let params: Vec<libsql::Value> =
            levels.iter().map(|l| libsql::Value::from(level_to_i64(*l))).collect();
        let mut rows = conn.query(&sql, params).await.map_err(store_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            out.push(row_to_memory(&row)?);
        }
        Ok(out)
    }

    async fn list_all(&self) -> Result<Vec<Memory>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows =
            conn.query(&format!("SELECT {MEMORY_COLUMNS} FROM memories"), ()).await.map_err(store_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            out.push(row_to_memory(&row)?);
        }
        Ok(out)
    }

    async fn upsert_connection(&self, connection: &Connection) -> Result<()> {
        let conn = self.db.connect().map_err(store_err)?;
        conn.execute(
            "INSERT INTO memory_connections (source_id, target_id, strength, kind, created_at, \
             last_activated, activation_count) VALUES (?1,?2,?3,?4,?5,?6,?7) \
             ON CONFLICT(source_id, target_id) DO UPDATE SET strength=excluded.strength, \
             kind=excluded.kind, last_activated=excluded.last_activated, \
             activation_count=excluded.activation_count",
            libsql::params![
                connection.source_id.to_string(),
                connection.target_id.to_string(),
                f64::from(connection.strength),
                connection_kind_str(connection.kind),
                fmt_ts(connection.created_at),
                fmt_ts(connection.last_activated),
                connection.activation_count as i64,
            ],
        )
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_connection(&self, source_id: Uuid, target_id: Uuid) -> Result<Option<Connection>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                "SELECT source_id, target_id, strength, kind, created_at, last_activated, activation_count \
                 FROM memory_connections WHERE source_id = ?1 AND target_id = ?2",
                libsql::params![source_id.to_string(), target_id.to_string()],
            )
            .await
            .map_err(store_err)?;
        match rows.next().await.map_err(store_err)? {
            Some(row) => Ok(Some(row_to_connection(&row)?)),
            None => Ok(None),
        }
    }

    async fn outgoing_connections(&self, source_id: Uuid) -> Result<Vec<Connection>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                "SELECT source_id, target_id, strength, kind, created_at, last_activated, activation_count \
                 FROM memory_connections WHERE source_id = ?1",
                libsql::params![source_id.to_string()],
            )
            .await
            .map_err(store_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            out.push(row_to_connection(&row)?);
        }
        Ok(out)
    }

    async fn connections_above_strength(&self, source_id: Uuid, min_strength: f32) -> Result<Vec<Connection>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                "SELECT source_id, target_id, strength, kind, created_at, last_activated, activation_count \
                 FROM memory_connections WHERE source_id = ?1 AND strength >= ?2",
                libsql::params![source_id.to_string(), f64::from(min_strength)],
            )
            .await
            .map_err(store_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            out.push(row_to_connection(&row)?);
        }
        Ok(out)
    }

    async fn get_bridge_cache(&self, fingerprint: &str) -> Result<Vec<BridgeCacheEntry>> {
        let conn = self.db.connect().map_err(store_err)?;
        let mut rows = conn
            .query(
                "SELECT memory_id, bridge_score, novelty_score, connection_potential, created_at \
                 FROM bridge_cache WHERE query_fingerprint = ?1",
                libsql::params![fingerprint],
            )
            .await
            .map_err(store_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            out.push(BridgeCacheEntry {
                query_fingerprint: fingerprint.to_string(),
                memory_id: Uuid::parse_str(&row.get::<String>(0).map_err(store_err)?)
                    .map_err(|e| Error::Inconsistent(e.to_string()))?,
                bridge_score: row.get::<f64>(1).map_err(store_err)? as f32,
                novelty_score: row.get::<f64>(2).map_err(store_err)? as f32,
                connection_potential: row.get::<f64>(3).map_err(store_err)? as f32,
                created_at: parse_ts(&row.get::<String>(4).map_err(store_err)?)?,
            });
        }
        Ok(out)
    }

    async fn put_bridge_cache(&self, fingerprint: &str, entries: Vec<BridgeCacheEntry>) -> Result<()> {
        let conn = self.db.connect().map_err(store_err)?;
        conn.execute("DELETE FROM bridge_cache WHERE query_fingerprint = ?1", libsql::params![fingerprint])
            .await
            .map_err(store_err)?;
        for entry in entries {
            conn.execute(
                "INSERT INTO bridge_cache (query_fingerprint, memory_id, bridge_score, novelty_score, \
                 connection_potential, created_at) VALUES (?1,?2,?3,?4,?5,?6)",
                libsql::params![
                    fingerprint,
                    entry.memory_id.to_string(),
                    f64::from(entry.bridge_score),
                    f64::from(entry.novelty_score),
                    f64::from(entry.connection_potential),
                    fmt_ts(entry.created_at),
                ],
            )
            .await
            .map_err(store_err)?;
        }
        Ok(())
    }

    async fn evict_expired_bridge_cache(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> Result<u64> {
        let conn = self.db.connect().map_err(store_err)?;
        let cutoff = now - ttl;
        let mut rows = conn
            .query("DELETE FROM bridge_cache WHERE created_at < ?1 RETURNING 1", libsql::params![fmt_ts(cutoff)])
            .await
            .map_err(store_err)?;
        let mut evicted = 0u64;
        while rows.next().await.map_err(store_err)?.is_some() {
            evicted += 1;
        }
        Ok(evicted)
    }

    async fn append_retrieval_stat(&self, stat: &RetrievalStat) -> Result<()> {
        let conn = self.db.connect().map_err(store_err)?;
        conn.execute(
            "INSERT INTO retrieval_stats (query_fingerprint, memory_id, kind, success_score, timestamp) \
             VALUES (?1,?2,?3,?4,?5)",
            libsql::params![
                stat.query_fingerprint.clone(),
                stat.memory_id.to_string(),
                retrieval_kind_str(stat.kind),
                stat.success_score.map(f64::from),
                fmt_ts(stat.timestamp),
            ],
        )
        .await
        .map_err(store_err)?;
        Ok(())
    }
}
