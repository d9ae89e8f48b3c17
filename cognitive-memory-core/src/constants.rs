//! Tunable constants for the cognitive memory engine.
//!
//! These mirror the defaults named in the system specification; all of them
//! are overridable through [`crate::config::Config`].

use std::time::Duration;

/// Width of the semantic embedding vector (`D_s`).
pub const SEMANTIC_DIM: usize = 384;

/// Width of the dimensional feature vector (`D_d`).
pub const DIMENSION_DIM: usize = 16;

/// Width of the fused vector stored in the vector store (`D_s + D_d`).
pub const FUSED_DIM: usize = SEMANTIC_DIM + DIMENSION_DIM;

/// Default scale factor applied to the dimension vector before fusion.
pub const DEFAULT_FUSION_ALPHA: f32 = 0.5;

/// Default activation threshold `θ`.
pub const DEFAULT_ACTIVATION_THRESHOLD: f32 = 0.7;

/// Amount the activation threshold is relaxed by, once, when fewer than
/// [`MIN_SEED_SURVIVORS`] seeds clear it.
pub const THRESHOLD_RELAXATION: f32 = 0.1;

/// Minimum number of seed survivors before the threshold is relaxed.
pub const MIN_SEED_SURVIVORS: usize = 3;

/// Default per-collection seed fanout cap (`k_seed`).
pub const DEFAULT_SEED_FANOUT: usize = 10;

/// Default total activation cap (`K`).
pub const DEFAULT_MAX_ACTIVATIONS: usize = 50;

/// Default spread depth bound (`d_max`).
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Decay-at-depth multiplier applied to the activation threshold when
/// deciding whether to keep spreading past a node (`θ · 0.6`).
pub const SPREAD_DECAY_FACTOR: f32 = 0.6;

/// Connection reinforcement learning rate `η`.
pub const REINFORCEMENT_ETA: f32 = 0.1;

/// Default bridge candidate sample size (`N_cand`).
pub const DEFAULT_BRIDGE_CANDIDATES: usize = 200;

/// Default number of bridges returned (`K_bridge`).
pub const DEFAULT_BRIDGE_K: usize = 5;

/// Default minimum novelty for a bridge candidate.
pub const DEFAULT_BRIDGE_NOVELTY_MIN: f32 = 0.4;

/// Default minimum connection potential for a bridge candidate.
pub const DEFAULT_BRIDGE_CP_MIN: f32 = 0.3;

/// Bridge cache entry TTL.
pub const BRIDGE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default episodic decay rate (per day).
pub const DEFAULT_EPISODIC_DECAY: f32 = 0.1;

/// Default semantic decay rate (per day).
pub const DEFAULT_SEMANTIC_DECAY: f32 = 0.01;

/// Effective-importance eviction floor `ε_evict`.
pub const DEFAULT_EVICT_FLOOR: f32 = 0.05;

/// Zero-access grace period before an episodic memory becomes evictable.
pub const ZERO_ACCESS_EVICT_AFTER: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Access-count threshold for episodic -> semantic promotion (`N_promote`).
pub const DEFAULT_PROMOTE_ACCESS_COUNT: u32 = 5;

/// Recency window required for promotion.
pub const PROMOTE_RECENCY_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Minimum number of strong outgoing edges required for promotion.
pub const PROMOTE_MIN_STRONG_EDGES: usize = 2;

/// Minimum strength an edge must have to count towards promotion.
pub const PROMOTE_EDGE_STRENGTH_MIN: f32 = 0.5;

/// Importance boost applied on promotion.
pub const PROMOTE_IMPORTANCE_BOOST: f32 = 0.1;

/// Default consolidation sweep interval.
pub const DEFAULT_CONSOLIDATION_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default file-sync poll interval (`T_poll`).
pub const DEFAULT_SYNC_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default file-sync worker pool size.
pub const DEFAULT_SYNC_WORKERS: usize = 4;

/// Default file-sync event channel capacity (backpressure bound).
pub const DEFAULT_SYNC_QUEUE_CAPACITY: usize = 256;

/// Initial retry backoff for a dirty sync path.
pub const SYNC_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Maximum retry backoff for a dirty sync path.
pub const SYNC_RETRY_MAX_DELAY: Duration = Duration::from_secs(60);

/// Number of dirty-path retries before surfacing health degradation.
pub const SYNC_MAX_RETRY_ATTEMPTS: u32 = 5;

/// Initial backoff for transient vector/metadata store errors.
pub const STORE_RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Backoff multiplier for transient vector/metadata store errors.
pub const STORE_RETRY_FACTOR: u32 = 2;

/// Maximum attempts for transient vector/metadata store errors.
pub const STORE_RETRY_MAX_ATTEMPTS: u32 = 5;

/// Default markdown extensions watched by the file sync engine.
pub const DEFAULT_WATCHED_EXTENSIONS: &[&str] = &["md", "markdown"];
