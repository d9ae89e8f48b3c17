use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::dimension::DimensionName;
use crate::constants::{DEFAULT_EPISODIC_DECAY, DEFAULT_SEMANTIC_DECAY};

/// Hierarchy level a [`Memory`] lives at. The discriminant doubles as the
/// vector store collection index, per the data model's invariant (a).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MemoryLevel {
    /// L0 — broad concepts.
    Concept = 0,
    /// L1 — mid-level contexts.
    Context = 1,
    /// L2 — specific episodes.
    Episode = 2,
}

impl MemoryLevel {
    /// Name of the vector store collection backing this level.
    #[must_use]
    pub fn collection_name(self) -> &'static str {
        match self {
            MemoryLevel::Concept => "concepts_L0",
            MemoryLevel::Context => "contexts_L1",
            MemoryLevel::Episode => "episodes_L2",
        }
    }
}

/// Whether a memory is still short-term ("episodic") or has been
/// consolidated into long-term ("semantic") storage. Transitions are
/// one-way: `Episodic -> Semantic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryType {
    /// Short-lived, subject to decay and eviction.
    Episodic,
    /// Promoted, decays slowly and is never evicted by the floor rule.
    Semantic,
}

/// A single stored experience: immutable identity plus mutable retrieval
/// statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Opaque, globally unique identifier.
    pub id: Uuid,
    /// Hierarchy level.
    pub level: MemoryLevel,
    /// Verbatim source text.
    pub content: String,
    /// Extracted cognitive dimensions, keyed by name.
    pub dimensions: HashMap<DimensionName, f32>,
    /// Key into the vector store uniquely identifying the fused vector.
    pub vector_ref: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent retrieval that activated this memory.
    pub last_accessed: DateTime<Utc>,
    /// Monotonically non-decreasing retrieval count.
    pub access_count: u64,
    /// Derived importance score in `[0, 1]`.
    pub importance_score: f32,
    /// Higher-level parent, if any (`level` strictly less than `self.level`).
    pub parent_id: Option<Uuid>,
    /// Episodic vs. semantic.
    pub memory_type: MemoryType,
    /// Per-day exponential decay coefficient.
    pub decay_rate: f32,
    /// Originating file path, when this memory came from the file sync engine.
    pub source_path: Option<String>,
}

impl Memory {
    /// Construct a freshly-stored episodic memory.
    #[must_use]
    pub fn new(
        level: MemoryLevel,
        content: String,
        dimensions: HashMap<DimensionName, f32>,
        vector_ref: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            level,
            content,
            dimensions,
            vector_ref,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            importance_score: 0.0,
            parent_id: None,
            memory_type: MemoryType::Episodic,
            decay_rate: DEFAULT_EPISODIC_DECAY,
            source_path: None,
        }
    }

    /// Attach a `parent_id` / `source_path` hint (builder-style, used by `store()`).
    #[must_use]
    pub fn with_parent(mut self, parent_id: Option<Uuid>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Attach a source path (builder-style).
    #[must_use]
    pub fn with_source_path(mut self, source_path: Option<String>) -> Self {
        self.source_path = source_path;
        self
    }

    /// Record an activation: bump `access_count` and `last_accessed`.
    /// `access_count` never decreases (data model invariant (d)).
    pub fn record_access(&mut self, at: DateTime<Utc>) {
        self.access_count += 1;
        if at > self.last_accessed {
            self.last_accessed = at;
        }
    }

    /// Promote this memory from episodic to semantic. Irreversible;
    /// calling it on an already-semantic memory is a no-op.
    pub fn promote(&mut self) {
        if self.memory_type == MemoryType::Episodic {
            self.memory_type = MemoryType::Semantic;
            self.decay_rate = DEFAULT_SEMANTIC_DECAY;
            self.importance_score = (self.importance_score + crate::constants::PROMOTE_IMPORTANCE_BOOST).min(1.0);
        }
    }

    /// Effective importance after exponential decay since `last_accessed`.
    #[must_use]
    pub fn effective_importance(&self, now: DateTime<Utc>) -> f32 {
        let days = (now - self.last_accessed).num_seconds().max(0) as f32 / 86_400.0;
        self.importance_score * (-self.decay_rate * days).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_memory_is_episodic_with_default_decay() {
        let m = Memory::new(MemoryLevel::Episode, "hello".into(), HashMap::new(), "v1".into());
        assert_eq!(m.memory_type, MemoryType::Episodic);
        assert_eq!(m.decay_rate, DEFAULT_EPISODIC_DECAY);
        assert_eq!(m.access_count, 0);
    }

    #[test]
    fn record_access_never_decreases_count() {
        let mut m = Memory::new(MemoryLevel::Episode, "x".into(), HashMap::new(), "v1".into());
        let t0 = m.last_accessed;
        m.record_access(t0 + chrono::Duration::seconds(1));
        m.record_access(t0 + chrono::Duration::seconds(2));
        assert_eq!(m.access_count, 2);
    }

    #[test]
    fn promote_is_one_way() {
        let mut m = Memory::new(MemoryLevel::Concept, "x".into(), HashMap::new(), "v1".into());
        m.importance_score = 0.5;
        m.promote();
        assert_eq!(m.memory_type, MemoryType::Semantic);
        assert!((m.decay_rate - DEFAULT_SEMANTIC_DECAY).abs() < f32::EPSILON);
        assert!((m.importance_score - 0.6).abs() < 1e-6);

        // Promoting again must not double the boost.
        m.promote();
        assert!((m.importance_score - 0.6).abs() < 1e-6);
    }

    #[test]
    fn effective_importance_decays_with_time() {
        let mut m = Memory::new(MemoryLevel::Episode, "x".into(), HashMap::new(), "v1".into());
        m.importance_score = 1.0;
        let later = m.last_accessed + chrono::Duration::days(10);
        let decayed = m.effective_importance(later);
        assert!(decayed < 1.0);
        assert!(decayed > 0.0);
    }

    proptest! {
        /// `access_count` tracks exactly the number of `record_access` calls
        /// and never decreases, and `last_accessed` only ever moves forward,
        /// for any sequence of (possibly out-of-order) access timestamps.
        #[test]
        fn record_access_count_matches_calls_and_never_decreases(offsets_secs in proptest::collection::vec(-1_000i64..1_000, 0..50)) {
            let mut m = Memory::new(MemoryLevel::Episode, "x".into(), HashMap::new(), "v1".into());
            let base = m.last_accessed;
            let mut prev_count = m.access_count;
            let mut prev_last_accessed = m.last_accessed;

            for offset in &offsets_secs {
                m.record_access(base + chrono::Duration::seconds(*offset));
                prop_assert!(m.access_count == prev_count + 1);
                prop_assert!(m.last_accessed >= prev_last_accessed);
                prev_count = m.access_count;
                prev_last_accessed = m.last_accessed;
            }
            prop_assert_eq!(m.access_count as usize, offsets_secs.len());
        }

        /// Promotion is one-way regardless of how many times it is called or
        /// what the starting `importance_score` is: once `Semantic`, a memory
        /// never reverts to `Episodic`, and repeated calls never re-apply the
        /// promotion boost.
        #[test]
        fn promote_is_one_way_for_any_starting_importance(
            importance in 0.0f32..=1.0,
            extra_calls in 0usize..10,
        ) {
            let mut m = Memory::new(MemoryLevel::Concept, "x".into(), HashMap::new(), "v1".into());
            m.importance_score = importance;
            m.promote();
            prop_assert_eq!(m.memory_type, MemoryType::Semantic);
            let boosted = m.importance_score;

            for _ in 0..extra_calls {
                m.promote();
                prop_assert_eq!(m.memory_type, MemoryType::Semantic);
                prop_assert!((m.importance_score - boosted).abs() < 1e-6);
            }
        }
    }
}
