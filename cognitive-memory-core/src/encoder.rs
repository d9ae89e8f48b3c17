//! Cognitive encoder: fuses a semantic embedding with a cognitive dimension
//! vector into a single similarity-comparable vector (`SPEC_FULL.md` §4.3).

use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::DEFAULT_FUSION_ALPHA;
use crate::dimensions::DimensionExtractor;
use crate::embeddings::{l2_normalize, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::types::{DimensionName, DimensionVector};

/// Text encoded into a fused vector plus the dimension scores that went
/// into it, so callers can persist `dimensions` alongside the vector
/// without recomputing the extraction.
#[derive(Debug, Clone)]
pub struct EncodedText {
    /// `D_s + D_d`-wide, L2-normalized fused vector.
    pub fused_vector: Vec<f32>,
    /// Named dimension scores (sparse — zero slots omitted).
    pub dimensions: HashMap<DimensionName, f32>,
}

/// Composes an [`EmbeddingProvider`] and a [`DimensionExtractor`] behind
/// `Arc<dyn _>`, matching the teacher's composition-over-inheritance
/// `SemanticService` shape. Stateless beyond its two collaborators and the
/// fusion scale factor, so it is cheap to share across tasks.
pub struct CognitiveEncoder {
    embedder: Arc<dyn EmbeddingProvider>,
    dimension_extractor: Arc<dyn DimensionExtractor>,
    alpha: f32,
}

impl CognitiveEncoder {
    /// Build an encoder with the default fusion scale (`α = 0.5`).
    #[must_use]
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, dimension_extractor: Arc<dyn DimensionExtractor>) -> Self {
        Self::with_alpha(embedder, dimension_extractor, DEFAULT_FUSION_ALPHA)
    }

    /// Build an encoder with a custom fusion scale factor, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_alpha(
        embedder: Arc<dyn EmbeddingProvider>,
        dimension_extractor: Arc<dyn DimensionExtractor>,
        alpha: f32,
    ) -> Self {
        Self { embedder, dimension_extractor, alpha: alpha.clamp(0.0, 1.0) }
    }

    /// Width of vectors this encoder produces (`D_s + D_d`).
    #[must_use]
    pub fn fused_dimension(&self) -> usize {
        self.embedder.dimension() + DimensionVector::default().slots.len()
    }

    /// Encode `text` into a fused, L2-normalized vector plus its dimension scores.
    ///
    /// # Errors
    /// Propagates the underlying [`EmbeddingProvider`]'s failure.
    pub async fn encode(&self, text: &str) -> Result<EncodedText> {
        let mut semantic = self.embedder.embed(text).await?;
        l2_normalize(&mut semantic);

        let dim_vector = self.dimension_extractor.extract(text);
        let scaled_dims: Vec<f32> = dim_vector.slots.iter().map(|v| v * self.alpha).collect();

        let mut fused = semantic;
        fused.extend(scaled_dims);

        if fused.len() != self.fused_dimension() {
            return Err(Error::Fatal(format!(
                "fused vector width {} does not match expected {}",
                fused.len(),
                self.fused_dimension()
            )));
        }

        l2_normalize(&mut fused);

        Ok(EncodedText { fused_vector: fused, dimensions: dim_vector.to_scores() })
    }
}
