use crate::types::DimensionName;

/// One keyword/regex cue and the weight it contributes when matched.
#[derive(Debug, Clone)]
pub struct Cue {
    /// Lowercase substring to match against the lowercased input text.
    pub pattern: &'static str,
    /// Signed contribution added to the dimension's running score when `pattern` is found.
    pub weight: f32,
}

const fn cue(pattern: &'static str, weight: f32) -> Cue {
    Cue { pattern, weight }
}

/// Keyword cue table mapping each [`DimensionName`] to the cues
/// [`super::extractor::LexiconDimensionExtractor`] scans for. A configuration
/// table rather than a trained model, matching the teacher's
/// `HeuristicExtractorConfig` style of externalized, tunable thresholds.
#[derive(Debug, Clone)]
pub struct DimensionLexicon {
    /// Cues for the positive pole of valence; negative cues subtract.
    pub valence_positive: Vec<Cue>,
    pub valence_negative: Vec<Cue>,
    pub arousal: Vec<Cue>,
    pub frustration: Vec<Cue>,
    pub satisfaction: Vec<Cue>,
    pub urgency: Vec<Cue>,
    pub deadline_proximity: Vec<Cue>,
    pub recency_reference: Vec<Cue>,
    pub duration_scope: Vec<Cue>,
    pub technical: Vec<Cue>,
    pub exploratory: Vec<Cue>,
    pub instructional: Vec<Cue>,
    pub reflective: Vec<Cue>,
    pub collaborative: Vec<Cue>,
    pub authoritative: Vec<Cue>,
    pub interpersonal: Vec<Cue>,
    pub isolated: Vec<Cue>,
}

impl Default for DimensionLexicon {
    fn default() -> Self {
        Self {
            valence_positive: vec![
                cue("great", 0.4), cue("good", 0.3), cue("happy", 0.5), cue("love", 0.5),
                cue("excellent", 0.5), cue("thanks", 0.3), cue("glad", 0.4),
            ],
            valence_negative: vec![
                cue("bad", 0.3), cue("terrible", 0.5), cue("hate", 0.5), cue("sad", 0.4),
                cue("awful", 0.5), cue("broken", 0.3), cue("worried", 0.3),
            ],
            arousal: vec![
                cue("!", 0.15), cue("urgent", 0.4), cue("excited", 0.5), cue("calm", -0.4),
                cue("panic", 0.6), cue("relaxed", -0.3),
            ],
            frustration: vec![
                cue("frustrat", 0.6), cue("annoying", 0.5), cue("stuck", 0.4),
                cue("again", 0.2), cue("why won't", 0.5), cue("ugh", 0.4),
            ],
            satisfaction: vec![
                cue("finally", 0.4), cue("works", 0.3), cue("solved", 0.5),
                cue("done", 0.3), cue("fixed", 0.4), cue("passing", 0.3),
            ],
            urgency: vec![
                cue("urgent", 0.6), cue("asap", 0.6), cue("immediately", 0.5),
                cue("now", 0.2), cue("critical", 0.5),
            ],
            deadline_proximity: vec![
                cue("deadline", 0.5), cue("due", 0.4), cue("by tomorrow", 0.6),
                cue("by friday", 0.5), cue("end of day", 0.5), cue("eod", 0.5),
            ],
            recency_reference: vec![
                cue("just now", 0.5), cue("earlier today", 0.5), cue("recently", 0.4),
                cue("yesterday", 0.4), cue("a moment ago", 0.5),
            ],
            duration_scope: vec![
                cue("for weeks", 0.6), cue("for months", 0.7), cue("long-term", 0.5),
                cue("ongoing", 0.4), cue("all year", 0.6),
            ],
            technical: vec![
                cue("function", 0.3), cue("api", 0.3), cue("database", 0.3),
                cue("algorithm", 0.4), cue("compile", 0.4), cue("config", 0.2),
            ],
            exploratory: vec![
                cue("what if", 0.5), cue("curious", 0.4), cue("wonder", 0.4),
                cue("explore", 0.4), cue("maybe we could", 0.4),
            ],
            instructional: vec![
                cue("step 1", 0.5), cue("first,", 0.3), cue("how to", 0.4),
                cue("follow these", 0.5), cue("instructions", 0.4),
            ],
            reflective: vec![
                cue("i realized", 0.5), cue("in hindsight", 0.6), cue("looking back", 0.5),
                cue("lesson learned", 0.6), cue("i think", 0.2),
            ],
            collaborative: vec![
                cue("we should", 0.4), cue("let's", 0.4), cue("together", 0.4),
                cue("our team", 0.4), cue("pair", 0.3),
            ],
            authoritative: vec![
                cue("must", 0.4), cue("required", 0.4), cue("policy", 0.4),
                cue("mandatory", 0.5), cue("you should", 0.2),
            ],
            interpersonal: vec![
                cue("thank you", 0.4), cue("appreciate", 0.4), cue("sorry", 0.3),
                cue("feel", 0.3), cue("friend", 0.3),
            ],
            isolated: vec![
                cue("on my own", 0.5), cue("by myself", 0.5), cue("alone", 0.4),
                cue("nobody", 0.4), cue("solo", 0.3),
            ],
        }
    }
}

impl DimensionLexicon {
    /// Cue list for a given dimension, used by the extractor's generic scan
    /// loop for every family except valence (which needs the signed
    /// positive/negative split above).
    #[must_use]
    pub fn cues_for(&self, dimension: DimensionName) -> &[Cue] {
        match dimension {
            DimensionName::Valence => &[],
            DimensionName::Arousal => &self.arousal,
            DimensionName::Frustration => &self.frustration,
            DimensionName::Satisfaction => &self.satisfaction,
            DimensionName::Urgency => &self.urgency,
            DimensionName::DeadlineProximity => &self.deadline_proximity,
            DimensionName::RecencyReference => &self.recency_reference,
            DimensionName::DurationScope => &self.duration_scope,
            DimensionName::Technical => &self.technical,
            DimensionName::Exploratory => &self.exploratory,
            DimensionName::Instructional => &self.instructional,
            DimensionName::Reflective => &self.reflective,
            DimensionName::Collaborative => &self.collaborative,
            DimensionName::Authoritative => &self.authoritative,
            DimensionName::Interpersonal => &self.interpersonal,
            DimensionName::Isolated => &self.isolated,
        }
    }
}
