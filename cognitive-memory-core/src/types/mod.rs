//! Core data model: [`Memory`], [`Connection`], dimensional features, and
//! the append-only [`RetrievalStat`] log. See `SPEC_FULL.md` §3 for the
//! invariants these types must uphold; enforcement lives in
//! [`crate::facade`] and the store trait implementations, not here — these
//! are plain data.

mod connection;
mod dimension;
mod memory;
mod retrieval_stat;

pub use connection::{Connection, ConnectionKind};
pub use dimension::{DimensionName, DimensionVector, ALL_DIMENSIONS};
pub use memory::{Memory, MemoryLevel, MemoryType};
pub use retrieval_stat::{RetrievalKind, RetrievalStat};
