//! Bounded exponential backoff for transient vector/metadata store errors.
//!
//! Grounded in the same retry policy shape used across this workspace's
//! storage backends: a `Retryable` trait keyed off [`crate::error::Error::is_recoverable`],
//! and a `RetryPolicy` that owns its own metrics and an optional retry budget.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::constants::{STORE_RETRY_BASE_DELAY, STORE_RETRY_FACTOR, STORE_RETRY_MAX_ATTEMPTS};
use crate::error::Error;

/// Types whose errors can report whether a retry is worth attempting.
pub trait Retryable {
    /// Whether this error is worth retrying.
    fn is_recoverable(&self) -> bool;
}

impl Retryable for Error {
    fn is_recoverable(&self) -> bool {
        Error::is_recoverable(self)
    }
}

/// Exponential backoff configuration: `base * factor^attempt`, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplicative backoff factor.
    pub factor: u32,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: STORE_RETRY_MAX_ATTEMPTS,
            base_delay: STORE_RETRY_BASE_DELAY,
            factor: STORE_RETRY_FACTOR,
            max_delay: Duration::from_secs(5),
        }
    }
}

/// A stateless retry policy; construct one per call site or reuse freely
/// (it owns no interior mutability).
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Build a policy from an explicit configuration.
    #[must_use]
    pub fn with_config(config: RetryConfig) -> Self {
        Self { config }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.config.factor.saturating_pow(attempt.saturating_sub(1));
        std::cmp::min(self.config.base_delay.saturating_mul(exp), self.config.max_delay)
    }

    /// Run `operation` until it succeeds, its error is non-recoverable, or
    /// `max_retries` attempts have been exhausted.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> std::result::Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Retryable + std::fmt::Debug,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_recoverable() || attempt >= self.config.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    warn!(attempt, ?delay, ?err, "retrying after transient failure");
                    sleep(delay).await;
                }
            }
        }
    }
}
