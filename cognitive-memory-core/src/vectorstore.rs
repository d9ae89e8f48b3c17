//! The [`VectorStore`] trait: three cosine-similarity collections indexed
//! by [`MemoryLevel`], per `SPEC_FULL.md` §4.4. Concrete implementations
//! live in the `cognitive-memory-storage-turso` and
//! `cognitive-memory-storage-redb` crates; tests use the in-memory one from
//! `cognitive-memory-test-utils`.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::types::MemoryLevel;

/// A payload filter applied during [`VectorStore::search`].
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    /// Restrict results to a specific `source_path` payload field.
    pub source_path: Option<String>,
}

/// One `(vector_ref, score)` search hit, ordered by descending score with
/// ties broken by ascending `vector_ref` (§4.4's guarantee).
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    /// Key uniquely identifying the vector within its collection.
    pub vector_ref: String,
    /// Cosine similarity against the query vector.
    pub score: f32,
}

/// Opaque key/value payload stored alongside a vector (e.g. `source_path`).
pub type VectorPayload = HashMap<String, String>;

/// Three cosine-similarity collections (`concepts_L0`, `contexts_L1`,
/// `episodes_L2`), one per [`MemoryLevel`].
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert a fused vector into `collection`. Atomic per call.
    async fn insert(
        &self,
        collection: MemoryLevel,
        vector_ref: &str,
        vector: &[f32],
        payload: VectorPayload,
    ) -> Result<()>;

    /// Remove a vector. Idempotent — deleting a missing ref is not an error.
    async fn delete(&self, collection: MemoryLevel, vector_ref: &str) -> Result<()>;

    /// Top-`k` cosine-similarity search within `collection`.
    async fn search(
        &self,
        collection: MemoryLevel,
        query: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<Vec<VectorHit>>;

    /// Search several collections at once (used by reconciliation and
    /// cross-level scans such as bridge candidate sampling).
    async fn batch_search(
        &self,
        collections: &[MemoryLevel],
        query: &[f32],
        k: usize,
        filter: Option<&VectorFilter>,
    ) -> Result<HashMap<MemoryLevel, Vec<VectorHit>>> {
        let mut out = HashMap::new();
        for &collection in collections {
            out.insert(collection, self.search(collection, query, k, filter).await?);
        }
        Ok(out)
    }

    /// List every `vector_ref` present in `collection`, used by the
    /// startup reconciliation sweep (`SPEC_FULL.md` §7).
    async fn list_refs(&self, collection: MemoryLevel) -> Result<Vec<String>>;

    /// Point lookup of a single stored vector, used by bridge discovery to
    /// score sampled candidates against the activated set without a full
    /// similarity search.
    async fn get_vector(&self, collection: MemoryLevel, vector_ref: &str) -> Result<Option<Vec<f32>>>;
}

/// Sort search hits per the store's ordering guarantee: descending score,
/// ties broken by ascending `vector_ref`. Shared by every `VectorStore`
/// implementation so the tie-break rule can't drift between backends.
#[must_use]
pub fn sort_hits(mut hits: Vec<VectorHit>) -> Vec<VectorHit> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.vector_ref.cmp(&b.vector_ref))
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_hits_breaks_ties_by_ascending_ref() {
        let hits = vec![
            VectorHit { vector_ref: "b".into(), score: 0.9 },
            VectorHit { vector_ref: "a".into(), score: 0.9 },
            VectorHit { vector_ref: "c".into(), score: 0.95 },
        ];
        let sorted = sort_hits(hits);
        assert_eq!(sorted[0].vector_ref, "c");
        assert_eq!(sorted[1].vector_ref, "a");
        assert_eq!(sorted[2].vector_ref, "b");
    }
}
