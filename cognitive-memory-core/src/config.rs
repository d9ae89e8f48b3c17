//! Runtime configuration, layered the way the teacher workspace's
//! `embeddings::config` module layers provider configuration: a typed
//! struct with `serde`-friendly defaults, an environment-variable
//! constructor, and an optional TOML file merged underneath the
//! environment (environment wins).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::Result;

/// Full configuration surface named in `SPEC_FULL.md` §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Activation threshold `θ`.
    pub activation_threshold: f32,
    /// Total activation cap `K`.
    pub max_activations: usize,
    /// Per-collection seed fanout `k_seed`.
    pub seed_fanout: usize,
    /// Spread depth bound `d_max`.
    pub max_depth: u32,

    /// Number of bridges returned (`K_bridge`).
    pub bridge_k: usize,
    /// Minimum novelty for a bridge candidate.
    pub bridge_novelty_min: f32,
    /// Minimum connection potential for a bridge candidate.
    pub bridge_cp_min: f32,
    /// Candidate sample size for bridge discovery (`N_cand`).
    pub bridge_candidates: usize,

    /// Episodic decay rate.
    pub episodic_decay: f32,
    /// Semantic decay rate.
    pub semantic_decay: f32,
    /// Access-count threshold for promotion.
    pub promote_access_count: u32,
    /// Eviction floor `ε_evict`.
    pub evict_floor: f32,

    /// Whether the monitoring/telemetry surface is enabled.
    pub monitoring_enabled: bool,
    /// Interval, in seconds, between monitoring samples.
    pub monitoring_interval_seconds: f64,

    /// Whether file-sync delete+reload runs as one atomic unit (vs. best effort).
    pub sync_atomic_operations: bool,
    /// File-sync poll interval.
    #[serde(with = "duration_secs")]
    pub sync_poll_interval: Duration,
    /// File-sync worker pool size.
    pub sync_workers: usize,

    /// Path to the metadata store database file.
    pub metadata_db_path: PathBuf,
    /// Vector store endpoint (file path or connection URL, backend-dependent).
    pub vector_store_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            activation_threshold: DEFAULT_ACTIVATION_THRESHOLD,
            max_activations: DEFAULT_MAX_ACTIVATIONS,
            seed_fanout: DEFAULT_SEED_FANOUT,
            max_depth: DEFAULT_MAX_DEPTH,

            bridge_k: DEFAULT_BRIDGE_K,
            bridge_novelty_min: DEFAULT_BRIDGE_NOVELTY_MIN,
            bridge_cp_min: DEFAULT_BRIDGE_CP_MIN,
            bridge_candidates: DEFAULT_BRIDGE_CANDIDATES,

            episodic_decay: DEFAULT_EPISODIC_DECAY,
            semantic_decay: DEFAULT_SEMANTIC_DECAY,
            promote_access_count: DEFAULT_PROMOTE_ACCESS_COUNT,
            evict_floor: DEFAULT_EVICT_FLOOR,

            monitoring_enabled: false,
            monitoring_interval_seconds: 5.0,

            sync_atomic_operations: true,
            sync_poll_interval: DEFAULT_SYNC_POLL_INTERVAL,
            sync_workers: DEFAULT_SYNC_WORKERS,

            metadata_db_path: PathBuf::from("cognitive_memory.db"),
            vector_store_endpoint: "cognitive_memory_vectors.db".to_string(),
        }
    }
}

impl Config {
    /// Load a TOML file (if present) as the base layer, then apply any of
    /// the environment variables named in `SPEC_FULL.md` §6 on top.
    pub fn load(toml_path: Option<&std::path::Path>) -> Result<Self> {
        let mut config = match toml_path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path)?;
                toml::from_str(&text).map_err(|e| {
                    crate::error::Error::Validation(format!("invalid config file: {e}"))
                })?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Overlay recognized environment variables onto an existing config.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_f32("ACTIVATION_THRESHOLD") {
            self.activation_threshold = v;
        }
        if let Some(v) = env_usize("MAX_ACTIVATIONS") {
            self.max_activations = v;
        }
        if let Some(v) = env_usize("BRIDGE_K") {
            self.bridge_k = v;
        }
        if let Some(v) = env_f32("BRIDGE_NOVELTY_MIN") {
            self.bridge_novelty_min = v;
        }
        if let Some(v) = env_f32("BRIDGE_CP_MIN") {
            self.bridge_cp_min = v;
        }
        if let Some(v) = env_f32("EPISODIC_DECAY") {
            self.episodic_decay = v;
        }
        if let Some(v) = env_f32("SEMANTIC_DECAY") {
            self.semantic_decay = v;
        }
        if let Some(v) = std::env::var("PROMOTE_ACCESS_COUNT")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            self.promote_access_count = v;
        }
        if let Some(v) = std::env::var("MONITORING_ENABLED")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
        {
            self.monitoring_enabled = v;
        }
        if let Some(v) = std::env::var("MONITORING_INTERVAL_SECONDS")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
        {
            self.monitoring_interval_seconds = v;
        }
        if let Some(v) = std::env::var("SYNC_ATOMIC_OPERATIONS")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
        {
            self.sync_atomic_operations = v;
        }
    }
}

fn env_f32(name: &str) -> Option<f32> {
    std::env::var(name).ok().and_then(|s| s.parse::<f32>().ok())
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|s| s.parse::<usize>().ok())
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let c = Config::default();
        assert_eq!(c.activation_threshold, DEFAULT_ACTIVATION_THRESHOLD);
        assert_eq!(c.max_activations, DEFAULT_MAX_ACTIVATIONS);
        assert_eq!(c.bridge_k, DEFAULT_BRIDGE_K);
    }

    #[test]
    fn env_override_wins_over_default() {
        std::env::set_var("ACTIVATION_THRESHOLD", "0.55");
        let mut c = Config::default();
        c.apply_env();
        assert!((c.activation_threshold - 0.55).abs() < f32::EPSILON);
        std::env::remove_var("ACTIVATION_THRESHOLD");
    }
}
