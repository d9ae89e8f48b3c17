//! Semantic embedding providers (`SPEC_FULL.md` §4.1).

mod hashing;
#[cfg(feature = "openai")]
mod openai;
mod provider;

pub use hashing::HashingEmbeddingProvider;
#[cfg(feature = "openai")]
pub use openai::OpenAiEmbeddingProvider;
pub use provider::{cosine_similarity, l2_normalize, EmbeddingProvider};
