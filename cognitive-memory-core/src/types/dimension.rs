use serde::{Deserialize, Serialize};

/// The closed set of 16 cognitive dimensions extracted from text, laid out
/// as four families of four slots each (`SPEC_FULL.md` §4.2). Emotional and
/// social dimensions live in `[-1, 1]`; temporal and contextual dimensions
/// live in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionName {
    // Emotional family — [-1, 1]
    /// Positive vs. negative affect.
    Valence,
    /// Intensity of affect.
    Arousal,
    /// Expressed frustration.
    Frustration,
    /// Expressed satisfaction.
    Satisfaction,

    // Temporal family — [0, 1]
    /// Expressed urgency.
    Urgency,
    /// Closeness to a named deadline.
    DeadlineProximity,
    /// Reference to recent events.
    RecencyReference,
    /// Breadth of the time span discussed.
    DurationScope,

    // Contextual family — [0, 1]
    /// Technical register.
    Technical,
    /// Exploratory / open-ended register.
    Exploratory,
    /// Instructional register.
    Instructional,
    /// Reflective register.
    Reflective,

    // Social family — [-1, 1]
    /// Collaborative framing.
    Collaborative,
    /// Authoritative framing.
    Authoritative,
    /// Interpersonal framing.
    Interpersonal,
    /// Isolated / solo framing.
    Isolated,
}

/// All 16 dimensions, in fixed slot order — this order is the canonical
/// layout used to build a [`DimensionVector`] for fusion.
pub const ALL_DIMENSIONS: [DimensionName; 16] = [
    DimensionName::Valence,
    DimensionName::Arousal,
    DimensionName::Frustration,
    DimensionName::Satisfaction,
    DimensionName::Urgency,
    DimensionName::DeadlineProximity,
    DimensionName::RecencyReference,
    DimensionName::DurationScope,
    DimensionName::Technical,
    DimensionName::Exploratory,
    DimensionName::Instructional,
    DimensionName::Reflective,
    DimensionName::Collaborative,
    DimensionName::Authoritative,
    DimensionName::Interpersonal,
    DimensionName::Isolated,
];

impl DimensionName {
    /// Declared range for this dimension's family.
    #[must_use]
    pub fn range(self) -> (f32, f32) {
        use DimensionName::{
            Arousal, Authoritative, Collaborative, DeadlineProximity, DurationScope, Exploratory,
            Frustration, Instructional, Interpersonal, Isolated, RecencyReference, Reflective,
            Satisfaction, Technical, Urgency, Valence,
        };
        match self {
            Valence | Arousal | Frustration | Satisfaction | Collaborative | Authoritative
            | Interpersonal | Isolated => (-1.0, 1.0),
            Urgency | DeadlineProximity | RecencyReference | DurationScope | Technical
            | Exploratory | Instructional | Reflective => (0.0, 1.0),
        }
    }

    /// Clamp a raw score into this dimension's declared range.
    #[must_use]
    pub fn clamp(self, value: f32) -> f32 {
        let (lo, hi) = self.range();
        value.clamp(lo, hi)
    }
}

/// A fixed-width (`D_d = 16`) vector of dimension scores in canonical slot
/// order, alongside the named map callers typically want.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionVector {
    /// Scores in [`ALL_DIMENSIONS`] order.
    pub slots: [f32; 16],
}

impl Default for DimensionVector {
    fn default() -> Self {
        Self { slots: [0.0; 16] }
    }
}

impl DimensionVector {
    /// Build from a sparse map; dimensions absent from `scores` default to 0,
    /// per `SPEC_FULL.md` §4.2.
    #[must_use]
    pub fn from_scores(scores: &std::collections::HashMap<DimensionName, f32>) -> Self {
        let mut slots = [0.0f32; 16];
        for (i, dim) in ALL_DIMENSIONS.iter().enumerate() {
            if let Some(&v) = scores.get(dim) {
                slots[i] = dim.clamp(v);
            }
        }
        Self { slots }
    }

    /// Expand into a named map, dropping zero-valued slots to keep the
    /// persisted `dimensions` payload compact.
    #[must_use]
    pub fn to_scores(&self) -> std::collections::HashMap<DimensionName, f32> {
        ALL_DIMENSIONS
            .iter()
            .copied()
            .zip(self.slots)
            .filter(|(_, v)| *v != 0.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_dimensions_default_to_zero() {
        let mut scores = HashMap::new();
        scores.insert(DimensionName::Urgency, 0.9);
        let v = DimensionVector::from_scores(&scores);
        assert_eq!(v.slots[4], 0.9); // Urgency is slot 4
        assert_eq!(v.slots[0], 0.0);
    }

    #[test]
    fn emotional_scores_clamp_to_signed_range() {
        let mut scores = HashMap::new();
        scores.insert(DimensionName::Valence, 5.0);
        scores.insert(DimensionName::Urgency, -5.0);
        let v = DimensionVector::from_scores(&scores);
        assert_eq!(v.slots[0], 1.0);
        assert_eq!(v.slots[4], 0.0);
    }

    #[test]
    fn round_trips_through_scores_map() {
        let mut scores = HashMap::new();
        scores.insert(DimensionName::Technical, 0.8);
        scores.insert(DimensionName::Collaborative, -0.4);
        let v = DimensionVector::from_scores(&scores);
        let back = v.to_scores();
        assert_eq!(back.get(&DimensionName::Technical), Some(&0.8));
        assert_eq!(back.get(&DimensionName::Collaborative), Some(&-0.4));
        assert_eq!(back.len(), 2);
    }
}
