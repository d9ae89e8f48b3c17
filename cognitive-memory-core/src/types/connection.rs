use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of associative-graph edge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionKind {
    /// Generic co-retrieval association.
    Associative,
    /// Parent/child hierarchy edge.
    Hierarchical,
    /// Ordered-in-time relation.
    Temporal,
    /// One memory's content implies or causes another.
    Causal,
}

/// Directed edge of the associative graph. `(source_id, target_id)` is the
/// primary key; `(a, b)` and `(b, a)` are independent edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Edge origin.
    pub source_id: Uuid,
    /// Edge destination.
    pub target_id: Uuid,
    /// Strength in `[0, 1]`.
    pub strength: f32,
    /// Edge kind.
    pub kind: ConnectionKind,
    /// When the edge was first created.
    pub created_at: DateTime<Utc>,
    /// When the edge was last traversed/reinforced.
    pub last_activated: DateTime<Utc>,
    /// Number of times this edge has been traversed or reinforced.
    pub activation_count: u64,
}

impl Connection {
    /// Create a brand-new edge with the given initial strength.
    #[must_use]
    pub fn new(source_id: Uuid, target_id: Uuid, strength: f32, kind: ConnectionKind) -> Self {
        let now = Utc::now();
        Self {
            source_id,
            target_id,
            strength: strength.clamp(0.0, 1.0),
            kind,
            created_at: now,
            last_activated: now,
            activation_count: 0,
        }
    }

    /// Reinforce this edge per the co-retrieval formula
    /// `s' = min(1, s + eta * min(a, b))`, bumping `activation_count` and
    /// `last_activated`. Monotonic except for explicit decay elsewhere.
    pub fn reinforce(&mut self, eta: f32, min_activation: f32, at: DateTime<Utc>) {
        self.strength = (self.strength + eta * min_activation).min(1.0);
        self.activation_count += 1;
        self.last_activated = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reinforcement_is_monotonic_and_capped() {
        let mut c = Connection::new(Uuid::new_v4(), Uuid::new_v4(), 0.9, ConnectionKind::Associative);
        let now = Utc::now();
        for _ in 0..10 {
            c.reinforce(0.1, 1.0, now);
        }
        assert!((c.strength - 1.0).abs() < f32::EPSILON);
        assert_eq!(c.activation_count, 10);
    }

    #[test]
    fn new_edge_clamps_strength() {
        let c = Connection::new(Uuid::new_v4(), Uuid::new_v4(), 1.5, ConnectionKind::Temporal);
        assert!((c.strength - 1.0).abs() < f32::EPSILON);
    }

    proptest! {
        /// For any starting strength and any sequence of `(eta, activation)`
        /// reinforcements, the edge's strength never decreases, never exceeds
        /// 1.0, and after enough reinforcement with a nonzero step it
        /// converges to exactly 1.0 — the formula's saturating ceiling.
        #[test]
        fn reinforce_is_monotonic_and_bounded_by_one(
            start in 0.0f32..=1.0,
            steps in proptest::collection::vec((0.0f32..=1.0, 0.0f32..=1.0), 0..30),
        ) {
            let mut c = Connection::new(Uuid::new_v4(), Uuid::new_v4(), start, ConnectionKind::Associative);
            let now = Utc::now();
            let mut prev_strength = c.strength;
            let mut prev_count = c.activation_count;

            for (eta, activation) in &steps {
                c.reinforce(*eta, *activation, now);
                prop_assert!(c.strength >= prev_strength - f32::EPSILON);
                prop_assert!(c.strength <= 1.0);
                prop_assert_eq!(c.activation_count, prev_count + 1);
                prev_strength = c.strength;
                prev_count = c.activation_count;
            }
        }

        /// Repeated reinforcement with a fixed positive step always drives
        /// strength to the 1.0 ceiling, regardless of the starting strength.
        #[test]
        fn repeated_reinforcement_converges_to_one(start in 0.0f32..=0.99) {
            let mut c = Connection::new(Uuid::new_v4(), Uuid::new_v4(), start, ConnectionKind::Associative);
            let now = Utc::now();
            for _ in 0..200 {
                c.reinforce(0.1, 1.0, now);
            }
            prop_assert!((c.strength - 1.0).abs() < 1e-4);
        }
    }
}
