//! Episodic → semantic promotion eligibility, split out from
//! [`super::DualMemoryManager`] for the same reason as [`super::decay`].

use chrono::{DateTime, Utc};

use crate::constants::{DEFAULT_PROMOTE_ACCESS_COUNT, PROMOTE_RECENCY_WINDOW};
use crate::types::{Memory, MemoryType};

/// Whether `memory` qualifies for promotion: `access_count >= N_promote`,
/// last accessed within the recency window, and at least
/// `PROMOTE_MIN_STRONG_EDGES` outgoing edges at or above
/// `PROMOTE_EDGE_STRENGTH_MIN` (the latter count is supplied by the
/// caller, which already queried the connection graph).
#[must_use]
pub fn is_promotion_eligible(memory: &Memory, now: DateTime<Utc>, strong_outgoing_edges: usize) -> bool {
    if memory.memory_type != MemoryType::Episodic {
        return false;
    }
    if memory.access_count < u64::from(DEFAULT_PROMOTE_ACCESS_COUNT) {
        return false;
    }
    let since_access = (now - memory.last_accessed).to_std().unwrap_or_default();
    if since_access > PROMOTE_RECENCY_WINDOW {
        return false;
    }
    strong_outgoing_edges >= crate::constants::PROMOTE_MIN_STRONG_EDGES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryLevel;
    use std::collections::HashMap;

    fn active_memory() -> Memory {
        let mut m = Memory::new(MemoryLevel::Episode, "x".into(), HashMap::new(), "v".into());
        m.access_count = 5;
        m
    }

    #[test]
    fn qualifying_memory_is_promotion_eligible() {
        let m = active_memory();
        assert!(is_promotion_eligible(&m, Utc::now(), 2));
    }

    #[test]
    fn too_few_strong_edges_blocks_promotion() {
        let m = active_memory();
        assert!(!is_promotion_eligible(&m, Utc::now(), 1));
    }

    #[test]
    fn too_few_accesses_blocks_promotion() {
        let mut m = active_memory();
        m.access_count = 4;
        assert!(!is_promotion_eligible(&m, Utc::now(), 2));
    }

    #[test]
    fn stale_last_access_blocks_promotion() {
        let mut m = active_memory();
        m.last_accessed = Utc::now() - chrono::Duration::days(8);
        assert!(!is_promotion_eligible(&m, Utc::now(), 2));
    }

    #[test]
    fn already_semantic_memory_is_not_re_eligible() {
        let mut m = active_memory();
        m.promote();
        assert!(!is_promotion_eligible(&m, Utc::now(), 2));
    }
}
