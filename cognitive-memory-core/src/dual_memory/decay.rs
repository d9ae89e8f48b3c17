//! Decay and eviction scoring, split out from [`super::DualMemoryManager`]
//! so the pure scoring logic can be unit tested without a store, mirroring
//! the teacher's `capacity::manager` / `scoring` split.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::types::{Memory, MemoryType};

/// Whether `memory`'s effective importance has decayed below `evict_floor`
/// and it has gone unaccessed for longer than `zero_access_grace`. Only
/// episodic memories are eligible — promoted (semantic) memories are never
/// evicted by this rule.
#[must_use]
pub fn is_evictable(memory: &Memory, now: DateTime<Utc>, evict_floor: f32, zero_access_grace: Duration) -> bool {
    if memory.memory_type != MemoryType::Episodic {
        return false;
    }
    if memory.access_count != 0 {
        return false;
    }
    let age = (now - memory.created_at).to_std().unwrap_or_default();
    if age <= zero_access_grace {
        return false;
    }
    memory.effective_importance(now) < evict_floor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::types::MemoryLevel;

    fn fresh_memory() -> Memory {
        Memory::new(MemoryLevel::Episode, "x".into(), HashMap::new(), "v".into())
    }

    #[test]
    fn never_accessed_old_low_importance_memory_is_evictable() {
        let mut m = fresh_memory();
        m.importance_score = 0.01;
        m.created_at = Utc::now() - chrono::Duration::days(31);
        m.last_accessed = m.created_at;
        assert!(is_evictable(&m, Utc::now(), 0.05, Duration::from_secs(30 * 24 * 60 * 60)));
    }

    #[test]
    fn recently_created_memory_is_not_evictable() {
        let mut m = fresh_memory();
        m.importance_score = 0.01;
        assert!(!is_evictable(&m, Utc::now(), 0.05, Duration::from_secs(30 * 24 * 60 * 60)));
    }

    #[test]
    fn accessed_memory_is_never_evictable() {
        let mut m = fresh_memory();
        m.importance_score = 0.01;
        m.created_at = Utc::now() - chrono::Duration::days(31);
        m.access_count = 1;
        assert!(!is_evictable(&m, Utc::now(), 0.05, Duration::from_secs(30 * 24 * 60 * 60)));
    }

    #[test]
    fn high_importance_memory_is_not_evictable() {
        let mut m = fresh_memory();
        m.importance_score = 0.9;
        m.created_at = Utc::now() - chrono::Duration::days(31);
        assert!(!is_evictable(&m, Utc::now(), 0.05, Duration::from_secs(30 * 24 * 60 * 60)));
    }

    #[test]
    fn semantic_memory_is_never_evictable() {
        let mut m = fresh_memory();
        m.importance_score = 0.01;
        m.created_at = Utc::now() - chrono::Duration::days(31);
        m.promote();
        assert!(!is_evictable(&m, Utc::now(), 0.05, Duration::from_secs(30 * 24 * 60 * 60)));
    }
}
