use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which bucket a retrieved memory landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalKind {
    /// Top-quartile activation.
    Core,
    /// Below the core quartile but still activated.
    Peripheral,
    /// Surfaced by bridge discovery rather than activation.
    Bridge,
}

/// One append-only log line: a memory surfaced for a query, used later to
/// reinforce connections (`SPEC_FULL.md` §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalStat {
    /// Fingerprint of the query that produced this entry.
    pub query_fingerprint: String,
    /// The memory that was surfaced.
    pub memory_id: Uuid,
    /// Which bucket it landed in.
    pub kind: RetrievalKind,
    /// Optional downstream success signal (e.g. the caller later told us
    /// this memory was useful).
    pub success_score: Option<f32>,
    /// When this entry was recorded.
    pub timestamp: DateTime<Utc>,
}
