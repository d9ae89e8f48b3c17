//! Cognitive dimension extraction (`SPEC_FULL.md` §4.2).

mod extractor;
mod lexicon;

pub use extractor::{DimensionExtractor, LexiconDimensionExtractor};
pub use lexicon::{Cue, DimensionLexicon};
