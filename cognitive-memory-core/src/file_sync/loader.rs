//! The `Loader` trait (`SPEC_FULL.md` §4.9): turns a file on disk into a
//! stream of memory candidates. Loaders are discovered at startup and
//! queried in registration order; the first `supports()` match wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::Result;
use crate::types::{DimensionName, MemoryLevel};

/// One memory to be stored, as yielded by a [`Loader`].
#[derive(Debug, Clone)]
pub struct MemoryCandidate {
    /// Verbatim text to encode and store.
    pub text: String,
    /// Dimension scores the loader already knows (e.g. a document's front
    /// matter); merged with extractor output by the façade rather than
    /// overriding it outright.
    pub dimensions_hint: HashMap<DimensionName, f32>,
    /// Hierarchy level this candidate should be stored at.
    pub level: MemoryLevel,
    /// A loader-local identifier for this candidate, used only so later
    /// candidates in the same [`Loader::load`] call can reference it via
    /// [`Self::parent_ref`]. Not the eventual stored `Memory::id`.
    pub id_hint: Option<Uuid>,
    /// `id_hint` of the candidate (earlier in the same load) that this one
    /// is a child of; resolved to the real stored id by the coordinator.
    pub parent_ref: Option<Uuid>,
}

/// Turns a file on disk into memory candidates. Implementations are
/// synchronous and local — no network calls — matching the teacher's
/// extractor shape of small, composable, side-effect-scoped units.
pub trait Loader: Send + Sync {
    /// Whether this loader can handle `path`, typically by extension.
    fn supports(&self, path: &Path) -> bool;

    /// Load `path` into zero or more memory candidates, in the order they
    /// should be stored (parents before the children that reference them).
    ///
    /// # Errors
    /// Propagates filesystem I/O or parse failures.
    fn load(&self, path: &Path) -> Result<Vec<MemoryCandidate>>;
}

/// Ordered set of loaders; the first registered loader whose `supports()`
/// returns true for a path wins.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn Loader>>,
}

impl LoaderRegistry {
    /// Build an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { loaders: Vec::new() }
    }

    /// Register a loader; later registrations are only consulted once
    /// every earlier loader's `supports()` returns false.
    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn Loader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Find the first loader that supports `path`.
    #[must_use]
    pub fn loader_for(&self, path: &Path) -> Option<&dyn Loader> {
        self.loaders.iter().find(|l| l.supports(path)).map(std::convert::AsRef::as_ref)
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry").field("loader_count", &self.loaders.len()).finish()
    }
}

/// Path validation probe shared by loaders that only need an extension
/// check: case-insensitive match against a fixed extension list.
#[must_use]
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|watched| watched.eq_ignore_ascii_case(ext)))
}

/// Ergonomic helper for tests/callers that want a loaded candidate's
/// `source_path` attached the way the façade's `store()` expects it.
#[must_use]
pub fn candidate_source_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysYes;
    impl Loader for AlwaysYes {
        fn supports(&self, _path: &Path) -> bool {
            true
        }
        fn load(&self, _path: &Path) -> Result<Vec<MemoryCandidate>> {
            Ok(vec![])
        }
    }

    struct NeverYes;
    impl Loader for NeverYes {
        fn supports(&self, _path: &Path) -> bool {
            false
        }
        fn load(&self, _path: &Path) -> Result<Vec<MemoryCandidate>> {
            Ok(vec![])
        }
    }

    #[test]
    fn first_matching_loader_wins() {
        let registry = LoaderRegistry::new().with_loader(Box::new(NeverYes)).with_loader(Box::new(AlwaysYes));
        assert!(registry.loader_for(&PathBuf::from("x.md")).is_some());
    }

    #[test]
    fn no_match_returns_none() {
        let registry = LoaderRegistry::new().with_loader(Box::new(NeverYes));
        assert!(registry.loader_for(&PathBuf::from("x.md")).is_none());
    }
}
