//! Core engine for a cognitive memory system: text "experiences" are
//! encoded into fused semantic/cognitive vectors, organized across a
//! three-tier hierarchy (concepts/contexts/episodes), retrieved through
//! activation spreading and bridge discovery, and maintained by a
//! recurring decay/promotion cycle and a markdown file sync engine.
//!
//! This crate defines the storage-agnostic engine: the [`VectorStore`] and
//! [`MetadataStore`] traits are implemented by sibling crates
//! (`cognitive-memory-storage-turso` for the networked relational/vector
//! backend, `cognitive-memory-storage-redb` for an embedded single-node
//! backend); `cognitive-memory-test-utils` provides in-memory
//! implementations for tests.

pub mod activation;
pub mod bridge;
pub mod config;
pub mod constants;
pub mod dimensions;
pub mod dual_memory;
pub mod embeddings;
pub mod encoder;
pub mod error;
pub mod facade;
pub mod file_sync;
pub mod metastore;
pub mod retry;
pub mod storage;
pub mod types;
pub mod vectorstore;

pub use activation::{ActivatedMemory, ActivationConfig, ActivationEngine, ActivationResult};
pub use bridge::{Bridge, BridgeCache, BridgeConfig, BridgeDiscovery};
pub use config::Config;
pub use dimensions::{DimensionExtractor, LexiconDimensionExtractor};
pub use dual_memory::{ConsolidationReport, DualMemoryConfig, DualMemoryManager};
pub use embeddings::{EmbeddingProvider, HashingEmbeddingProvider};
#[cfg(feature = "openai")]
pub use embeddings::OpenAiEmbeddingProvider;
pub use encoder::{CognitiveEncoder, EncodedText};
pub use error::{Error, Result};
pub use facade::{
    reconcile, CognitiveMemory, MemoryConfig, RecallItem, RecallLimits, RecallResult,
    ReconciliationReport, StoreContext, StoreResult, SystemStats,
};
pub use file_sync::{
    FileSyncCoordinator, FileSyncEngine, Loader, LoaderRegistry, MarkdownLoader, MemoryCandidate,
    MemorySink, SyncEvent, SyncEventKind, SyncHealth,
};
pub use metastore::{BridgeCacheEntry, MetadataStore};
pub use retry::{RetryConfig, RetryPolicy};
pub use storage::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use types::{
    Connection, ConnectionKind, DimensionName, DimensionVector, Memory, MemoryLevel, MemoryType,
    RetrievalKind, RetrievalStat,
};
pub use vectorstore::{sort_hits, VectorFilter, VectorHit, VectorPayload, VectorStore};
