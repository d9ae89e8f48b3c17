//! Default `Loader`: splits a markdown file into a context-level parent
//! (the whole document) and one episode-level child per `##` section,
//! matching the hierarchy-level invariant that a child's `parent_id` point
//! at an already-stored, strictly-higher-level memory.

use std::collections::HashMap;
use std::path::Path;

use uuid::Uuid;

use super::loader::{has_extension, Loader, MemoryCandidate};
use crate::constants::DEFAULT_WATCHED_EXTENSIONS;
use crate::error::Result;
use crate::types::MemoryLevel;

/// Loads `.md`/`.markdown` files. The whole file becomes a `Context`-level
/// memory; each top-level (`##`) section becomes an `Episode`-level child
/// referencing it, so a single note still yields a small, queryable
/// hierarchy rather than one undifferentiated blob.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownLoader;

impl MarkdownLoader {
    /// Build a new markdown loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn split_sections(content: &str) -> Vec<(String, String)> {
        let mut sections = Vec::new();
        let mut current_title = String::new();
        let mut current_body = String::new();

        for line in content.lines() {
            if let Some(title) = line.strip_prefix("## ") {
                if !current_body.trim().is_empty() {
                    sections.push((current_title.clone(), current_body.trim().to_string()));
                }
                current_title = title.trim().to_string();
                current_body.clear();
            } else {
                current_body.push_str(line);
                current_body.push('\n');
            }
        }
        if !current_body.trim().is_empty() {
            sections.push((current_title, current_body.trim().to_string()));
        }
        sections
    }
}

impl Loader for MarkdownLoader {
    fn supports(&self, path: &Path) -> bool {
        has_extension(path, DEFAULT_WATCHED_EXTENSIONS)
    }

    fn load(&self, path: &Path) -> Result<Vec<MemoryCandidate>> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let parent_id = Uuid::new_v4();
        let mut candidates = vec![MemoryCandidate {
            text: content.clone(),
            dimensions_hint: HashMap::new(),
            level: MemoryLevel::Context,
            id_hint: Some(parent_id),
            parent_ref: None,
        }];

        for (title, body) in Self::split_sections(&content) {
            if body.is_empty() {
                continue;
            }
            let text = if title.is_empty() { body } else { format!("{title}\n\n{body}") };
            candidates.push(MemoryCandidate {
                text,
                dimensions_hint: HashMap::new(),
                level: MemoryLevel::Episode,
                id_hint: None,
                parent_ref: Some(parent_id),
            });
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_markdown_extensions_only() {
        let loader = MarkdownLoader::new();
        assert!(loader.supports(Path::new("notes.md")));
        assert!(loader.supports(Path::new("notes.markdown")));
        assert!(!loader.supports(Path::new("notes.txt")));
    }

    #[test]
    fn single_section_file_yields_parent_and_one_child() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Title\n\nintro text\n\n## Section One\n\nbody one\n").unwrap();

        let loader = MarkdownLoader::new();
        let candidates = loader.load(&path).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].level, MemoryLevel::Context);
        assert_eq!(candidates[1].level, MemoryLevel::Episode);
        assert!(candidates[1].parent_ref.is_some());
    }

    #[test]
    fn empty_file_yields_no_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.md");
        std::fs::write(&path, "").unwrap();

        let loader = MarkdownLoader::new();
        assert!(loader.load(&path).unwrap().is_empty());
    }

    #[test]
    fn file_with_no_sections_yields_only_the_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.md");
        std::fs::write(&path, "just a flat note with no headers\n").unwrap();

        let loader = MarkdownLoader::new();
        let candidates = loader.load(&path).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].level, MemoryLevel::Context);
    }
}
