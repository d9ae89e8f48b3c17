//! Polling detection layer (`SPEC_FULL.md` §4.9): walks a directory tree on
//! each tick, diffs against the previous snapshot, and emits `{Added,
//! Modified, Deleted}` events in lexicographic path order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::Result;

/// Per-path snapshot used to detect changes between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileState {
    mtime: Option<SystemTime>,
    size: u64,
}

/// What happened to a watched path between the previous tick and this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEventKind {
    /// The path did not exist before and exists now.
    Added,
    /// The path existed before and its mtime or size changed.
    Modified,
    /// The path existed before and no longer exists.
    Deleted,
}

/// One detected change, carrying the absolute path it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    /// Absolute path the event applies to.
    pub path: PathBuf,
    /// What changed.
    pub kind: SyncEventKind,
}

/// Walks `root` on each [`Poller::tick`], filtering to the configured
/// extensions (default: markdown), and reports the diff against the
/// previous tick. Holds its own snapshot in memory; survives restart only
/// in the sense that the first tick after a restart reports every matching
/// file as `Added`.
pub struct Poller {
    root: PathBuf,
    extensions: Vec<String>,
    known: BTreeMap<PathBuf, FileState>,
}

impl Poller {
    /// Build a poller rooted at `root`, filtered to `extensions` (without
    /// leading dots, e.g. `["md", "markdown"]`).
    #[must_use]
    pub fn new(root: PathBuf, extensions: Vec<String>) -> Self {
        Self { root, extensions, known: BTreeMap::new() }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|watched| watched.eq_ignore_ascii_case(ext)))
    }

    fn scan(&self) -> Result<BTreeMap<PathBuf, FileState>> {
        let mut found = BTreeMap::new();
        if self.root.exists() {
            Self::walk(&self.root, &mut |path| {
                if self.matches_extension(&path) {
                    let metadata = std::fs::metadata(&path)?;
                    found.insert(
                        path,
                        FileState { mtime: metadata.modified().ok(), size: metadata.len() },
                    );
                }
                Ok(())
            })?;
        }
        Ok(found)
    }

    fn walk(dir: &Path, visit: &mut impl FnMut(PathBuf) -> Result<()>) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(std::fs::DirEntry::path);
        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                Self::walk(&path, visit)?;
            } else {
                visit(path)?;
            }
        }
        Ok(())
    }

    /// Scan the tree once, diff against the previous snapshot, and return
    /// events in lexicographic path order. Updates the held snapshot.
    ///
    /// # Errors
    /// Propagates filesystem I/O failures encountered while walking `root`.
    pub fn tick(&mut self) -> Result<Vec<SyncEvent>> {
        let current = self.scan()?;
        let mut events = Vec::new();

        for (path, state) in &current {
            match self.known.get(path) {
                None => events.push(SyncEvent { path: path.clone(), kind: SyncEventKind::Added }),
                Some(prev) if prev != state => {
                    events.push(SyncEvent { path: path.clone(), kind: SyncEventKind::Modified });
                }
                Some(_) => {}
            }
        }
        for path in self.known.keys() {
            if !current.contains_key(path) {
                events.push(SyncEvent { path: path.clone(), kind: SyncEventKind::Deleted });
            }
        }
        events.sort_by(|a, b| a.path.cmp(&b.path));

        self.known = current;
        Ok(events)
    }
}
