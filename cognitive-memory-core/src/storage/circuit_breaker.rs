//! Circuit breaker protecting calls into a vector or metadata store backend.
//!
//! ## States
//!
//! - **Closed**: normal operation, all calls pass through.
//! - **Open**: too many consecutive failures; calls fail fast with
//!   [`Error::StoreUnavailable`].
//! - **Half-open**: after `timeout` has elapsed, one call is allowed through
//!   to probe recovery.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation.
    Closed,
    /// Rejecting calls immediately.
    Open,
    /// Probing for recovery.
    HalfOpen,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Duration to wait in `Open` before probing again.
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Running totals for observability/`stats()`.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerStats {
    /// Total calls attempted.
    pub total_calls: u64,
    /// Calls that succeeded.
    pub successful_calls: u64,
    /// Calls that failed.
    pub failed_calls: u64,
    /// Calls rejected because the circuit was open.
    pub rejected_calls: u64,
}

struct Inner {
    state: CircuitState,
    stats: CircuitBreakerStats,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Guards calls into a storage backend, failing fast once it is observed
/// to be down rather than piling up timeouts.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Arc<RwLock<Inner>>,
}

impl CircuitBreaker {
    /// Build a circuit breaker from the given configuration.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Arc::new(RwLock::new(Inner {
                state: CircuitState::Closed,
                stats: CircuitBreakerStats::default(),
                consecutive_failures: 0,
                opened_at: None,
            })),
        }
    }

    /// Current snapshot of the circuit's statistics.
    pub async fn stats(&self) -> CircuitBreakerStats {
        self.inner.read().await.stats.clone()
    }

    /// Execute `operation` under the circuit breaker's protection.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.should_allow().await {
            let mut inner = self.inner.write().await;
            inner.stats.rejected_calls += 1;
            debug!("circuit breaker open, rejecting call");
            return Err(Error::StoreUnavailable("circuit breaker open".into()));
        }

        {
            let mut inner = self.inner.write().await;
            inner.stats.total_calls += 1;
        }

        let result = operation().await;
        self.record(&result).await;
        result
    }

    async fn should_allow(&self) -> bool {
        let mut inner = self.inner.write().await;
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.config.timeout {
                    info!("circuit breaker entering half-open probe");
                    inner.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => true,
        }
    }

    async fn record<T>(&self, result: &Result<T>) {
        let mut inner = self.inner.write().await;
        match result {
            Ok(_) => {
                inner.stats.successful_calls += 1;
                inner.consecutive_failures = 0;
                if inner.state != CircuitState::Closed {
                    info!("circuit breaker closing after successful probe");
                }
                inner.state = CircuitState::Closed;
                inner.opened_at = None;
            }
            Err(_) => {
                inner.stats.failed_calls += 1;
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    if inner.state != CircuitState::Open {
                        warn!(
                            failures = inner.consecutive_failures,
                            "circuit breaker opening"
                        );
                    }
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 2,
            timeout: Duration::from_secs(60),
        });

        for _ in 0..2 {
            let _ = cb
                .call(|| async { Err::<(), _>(Error::Transient("boom".into())) })
                .await;
        }

        let result = cb.call(|| async { Ok::<_, Error>(()) }).await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn closed_circuit_passes_calls_through() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig::default());
        let result = cb.call(|| async { Ok::<_, Error>(42) }).await.unwrap();
        assert_eq!(result, 42);
        assert_eq!(cb.stats().await.successful_calls, 1);
    }
}
