use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use super::provider::{l2_normalize, EmbeddingProvider};
use crate::constants::SEMANTIC_DIM;
use crate::error::Result;

/// Default maximum number of whitespace tokens considered per input; longer
/// text is truncated, satisfying the "provider MUST internally
/// truncate/chunk" guarantee of `SPEC_FULL.md` §4.1 without pulling in a
/// tokenizer dependency.
const MAX_TOKENS: usize = 4096;

/// Deterministic, dependency-free embedding provider: hashes token
/// unigrams and bigrams into a fixed-width bucket vector, then
/// L2-normalizes. Used as the default provider and throughout this crate's
/// test suite, so building and testing never requires network access or
/// model files — the same role the teacher's `embeddings::mock_model`
/// plays next to its "real" ONNX-backed provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashingEmbeddingProvider {
    dimension: usize,
}

impl HashingEmbeddingProvider {
    /// Build a provider producing `D_s`-wide vectors.
    #[must_use]
    pub fn new() -> Self {
        Self { dimension: SEMANTIC_DIM }
    }

    /// Build a provider with a custom width (used by tests that want small
    /// vectors for readability).
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_bucket(&self, token: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() as usize) % self.dimension
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens: Vec<&str> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
            .take(MAX_TOKENS)
            .collect();

        for token in &tokens {
            let lower = token.to_lowercase();
            let bucket = self.hash_bucket(&lower);
            vector[bucket] += 1.0;
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0].to_lowercase(), pair[1].to_lowercase());
            let bucket = self.hash_bucket(&bigram);
            vector[bucket] += 0.5;
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embed_is_deterministic() {
        let provider = HashingEmbeddingProvider::new();
        let a = provider.embed("hello world").await.unwrap();
        let b = provider.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn embed_produces_unit_vector() {
        let provider = HashingEmbeddingProvider::new();
        let v = provider.embed("some text to embed").await.unwrap();
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn similar_texts_are_more_similar_than_unrelated_ones() {
        let provider = HashingEmbeddingProvider::new();
        let a = provider.embed("transformer attention heads learn positional structure").await.unwrap();
        let b = provider.embed("attention positional structure in transformers").await.unwrap();
        let c = provider.embed("ocean tides follow the moon").await.unwrap();

        let sim_ab = super::super::provider::cosine_similarity(&a, &b);
        let sim_ac = super::super::provider::cosine_similarity(&a, &c);
        assert!(sim_ab > sim_ac);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let provider = HashingEmbeddingProvider::new();
        let v = provider.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let provider = HashingEmbeddingProvider::new();
        let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let batch = provider.embed_batch(&texts).await.unwrap();
        for (text, vector) in texts.iter().zip(&batch) {
            let single = provider.embed(text).await.unwrap();
            assert_eq!(&single, vector);
        }
    }
}
