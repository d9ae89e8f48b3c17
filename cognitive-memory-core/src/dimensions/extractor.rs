use std::collections::HashMap;

use super::lexicon::DimensionLexicon;
use crate::types::{DimensionName, DimensionVector, ALL_DIMENSIONS};

/// Derives a [`DimensionVector`] from raw text (`SPEC_FULL.md` §4.2).
/// Implementations are synchronous and side-effect free — no network, no
/// model inference — so they can run inline on the store-time hot path.
pub trait DimensionExtractor: Send + Sync {
    /// Score all 16 dimensions for `text`.
    fn extract(&self, text: &str) -> DimensionVector;
}

/// Default [`DimensionExtractor`]: scans `text` against a keyword/regex cue
/// table per dimension and sums matched weights, clamping to each
/// dimension's declared range. No fine-tuned sentiment model is used —
/// training one is out of scope here, matching how the teacher's
/// `HeuristicExtractor` favors auditable rule tables over opaque scoring.
#[derive(Debug, Clone, Default)]
pub struct LexiconDimensionExtractor {
    lexicon: DimensionLexicon,
}

impl LexiconDimensionExtractor {
    /// Build an extractor using the built-in lexicon.
    #[must_use]
    pub fn new() -> Self {
        Self { lexicon: DimensionLexicon::default() }
    }

    /// Build an extractor from a custom cue table.
    #[must_use]
    pub fn with_lexicon(lexicon: DimensionLexicon) -> Self {
        Self { lexicon }
    }

    fn score_cues(lower: &str, cues: &[super::lexicon::Cue]) -> f32 {
        cues.iter()
            .filter(|c| lower.contains(c.pattern))
            .map(|c| c.weight)
            .sum()
    }

    fn score_valence(&self, lower: &str) -> f32 {
        Self::score_cues(lower, &self.lexicon.valence_positive)
            - Self::score_cues(lower, &self.lexicon.valence_negative)
    }
}

impl DimensionExtractor for LexiconDimensionExtractor {
    fn extract(&self, text: &str) -> DimensionVector {
        let lower = text.to_lowercase();
        let mut scores: HashMap<DimensionName, f32> = HashMap::new();

        for dim in ALL_DIMENSIONS {
            let raw = if matches!(dim, DimensionName::Valence) {
                self.score_valence(&lower)
            } else {
                Self::score_cues(&lower, self.lexicon.cues_for(dim))
            };
            if raw != 0.0 {
                scores.insert(dim, dim.clamp(raw));
            }
        }

        DimensionVector::from_scores(&scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(v: &DimensionVector, dim: DimensionName) -> f32 {
        let idx = ALL_DIMENSIONS.iter().position(|d| *d == dim).unwrap();
        v.slots[idx]
    }

    #[test]
    fn positive_text_scores_positive_valence() {
        let extractor = LexiconDimensionExtractor::new();
        let v = extractor.extract("This is great, thanks so much!");
        assert!(slot(&v, DimensionName::Valence) > 0.0);
    }

    #[test]
    fn negative_text_scores_negative_valence() {
        let extractor = LexiconDimensionExtractor::new();
        let v = extractor.extract("This is terrible and broken, I hate it.");
        assert!(slot(&v, DimensionName::Valence) < 0.0);
    }

    #[test]
    fn urgent_deadline_text_scores_temporal_family() {
        let extractor = LexiconDimensionExtractor::new();
        let v = extractor.extract("This is urgent, the deadline is by tomorrow.");
        assert!(slot(&v, DimensionName::Urgency) > 0.0);
        assert!(slot(&v, DimensionName::DeadlineProximity) > 0.0);
    }

    #[test]
    fn technical_instructional_text_scores_contextual_family() {
        let extractor = LexiconDimensionExtractor::new();
        let v = extractor.extract("Step 1: call the api function, then check the database.");
        assert!(slot(&v, DimensionName::Technical) > 0.0);
        assert!(slot(&v, DimensionName::Instructional) > 0.0);
    }

    #[test]
    fn collaborative_text_scores_social_family() {
        let extractor = LexiconDimensionExtractor::new();
        let v = extractor.extract("Let's pair on this together with our team.");
        assert!(slot(&v, DimensionName::Collaborative) > 0.0);
    }

    #[test]
    fn solo_text_scores_isolated_not_collaborative() {
        let extractor = LexiconDimensionExtractor::new();
        let v = extractor.extract("I worked on this alone, by myself, nobody helped.");
        assert!(slot(&v, DimensionName::Isolated) > 0.0);
        assert_eq!(slot(&v, DimensionName::Collaborative), 0.0);
    }

    #[test]
    fn unmatched_text_leaves_all_dimensions_at_zero() {
        let extractor = LexiconDimensionExtractor::new();
        let v = extractor.extract("The quick brown fox jumps over the lazy dog.");
        assert!(v.slots.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn extreme_repetition_clamps_to_declared_range() {
        let extractor = LexiconDimensionExtractor::new();
        let text = "great ".repeat(50);
        let v = extractor.extract(&text);
        assert!(slot(&v, DimensionName::Valence) <= 1.0);
    }
}
