//! Error taxonomy for the cognitive memory engine.
//!
//! Mirrors the policy described in the system specification: `Transient`
//! and `StoreUnavailable` are retried locally with bounded backoff;
//! `Inconsistent` triggers the orphan sweep in [`crate::facade::reconcile`];
//! `Timeout` aborts without partial mutation; `Fatal` is meant to propagate
//! to whatever process supervises this crate.

use uuid::Uuid;

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the cognitive memory engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad input to a façade operation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced id or path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The vector or metadata backend is unavailable after exhausting retries.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A vector hit was observed with no corresponding metadata row, or vice versa.
    #[error("inconsistent state: {0}")]
    Inconsistent(String),

    /// The operation's deadline elapsed before it completed.
    #[error("operation timed out")]
    Timeout,

    /// A condition that is expected to succeed on retry.
    #[error("transient error: {0}")]
    Transient(String),

    /// An error that should propagate to the process supervisor (e.g. model load failure).
    #[error("fatal error: {0}")]
    Fatal(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem I/O failure (file sync engine).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding provider failure.
    #[error("embedding error: {0}")]
    Embedding(#[from] anyhow::Error),
}

impl Error {
    /// A memory id was not found.
    #[must_use]
    pub fn memory_not_found(id: Uuid) -> Self {
        Error::NotFound(format!("memory {id}"))
    }

    /// Whether this error is recoverable by local retry with backoff.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Transient(_) | Error::StoreUnavailable(_) | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_and_store_unavailable_are_recoverable() {
        assert!(Error::Transient("retry me".into()).is_recoverable());
        assert!(Error::StoreUnavailable("down".into()).is_recoverable());
    }

    #[test]
    fn validation_and_fatal_are_not_recoverable() {
        assert!(!Error::Validation("bad input".into()).is_recoverable());
        assert!(!Error::Fatal("model load failed".into()).is_recoverable());
        assert!(!Error::Timeout.is_recoverable());
    }

    #[test]
    fn not_found_formats_the_id() {
        let id = Uuid::nil();
        let err = Error::memory_not_found(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
