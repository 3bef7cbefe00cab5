//! Resilient external calls.
//!
//! One reusable wrapper - bounded retries, exponential backoff with
//! deterministic jitter, a per-attempt timeout, and a circuit breaker that
//! short-circuits an operation after repeated consecutive failures - used
//! uniformly by every external call site instead of ad hoc retry loops.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// Retry, timeout, and circuit-breaker policy for external calls.
pub struct Resilience {
    max_attempts: u32,
    backoff_base: Duration,
    timeout: Duration,
    failure_threshold: u32,
    cooldown: Duration,
    breakers: Mutex<HashMap<String, BreakerState>>,
}

#[derive(Debug, Clone, Default)]
struct BreakerState {
    consecutive_failures: u32,
    open_until: Option<DateTime<Utc>>,
}

impl Resilience {
    /// Create a policy.
    pub fn new(max_attempts: u32, backoff_base: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
            timeout,
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Set the consecutive-failure threshold for opening the circuit.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set the cooldown before an open circuit admits calls again.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Run `f` under this policy.
    ///
    /// Retries transient failures up to the attempt budget; deterministic
    /// errors (config, validation) are returned immediately. When the
    /// circuit for `operation` is open, the call short-circuits without
    /// touching the provider.
    pub async fn call<F, Fut, T>(&self, operation: &str, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.is_open(operation) {
            return Err(PipelineError::CircuitOpen {
                operation: operation.to_string(),
            });
        }

        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            let outcome = tokio::time::timeout(self.timeout, f()).await;

            let error = match outcome {
                Ok(Ok(value)) => {
                    self.record_success(operation);
                    return Ok(value);
                }
                Ok(Err(e)) => e,
                Err(_) => PipelineError::Timeout {
                    operation: operation.to_string(),
                    millis: self.timeout.as_millis() as u64,
                },
            };

            if !error.is_transient() {
                self.record_failure(operation);
                return Err(error);
            }

            warn!(operation, attempt, %error, "external call failed");
            self.record_failure(operation);
            last_error = Some(error);

            if attempt < self.max_attempts {
                let delay = self.backoff_delay(operation, attempt);
                debug!(operation, ?delay, "backing off before retry");
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| PipelineError::Timeout {
            operation: operation.to_string(),
            millis: self.timeout.as_millis() as u64,
        }))
    }

    /// Exponential backoff with deterministic, hash-derived jitter.
    ///
    /// The jitter depends only on (operation, attempt), so retry timing is
    /// reproducible across runs - no RNG in the hot path.
    fn backoff_delay(&self, operation: &str, attempt: u32) -> Duration {
        let exponential = self.backoff_base.saturating_mul(1u32 << (attempt - 1).min(8));

        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update(attempt.to_le_bytes());
        let hash = hasher.finalize();
        let jitter_ms =
            u64::from_le_bytes(hash[..8].try_into().expect("sha256 yields 32 bytes"))
                % (self.backoff_base.as_millis().max(1) as u64);

        exponential + Duration::from_millis(jitter_ms)
    }

    fn is_open(&self, operation: &str) -> bool {
        let mut breakers = self.breakers.lock().expect("breaker lock poisoned");
        if let Some(state) = breakers.get_mut(operation) {
            if let Some(open_until) = state.open_until {
                if Utc::now() < open_until {
                    return true;
                }
                // Cooldown elapsed: half-open, admit one attempt
                state.open_until = None;
                state.consecutive_failures = self.failure_threshold.saturating_sub(1);
            }
        }
        false
    }

    fn record_success(&self, operation: &str) {
        let mut breakers = self.breakers.lock().expect("breaker lock poisoned");
        breakers.remove(operation);
    }

    fn record_failure(&self, operation: &str) {
        let mut breakers = self.breakers.lock().expect("breaker lock poisoned");
        let state = breakers.entry(operation.to_string()).or_default();
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.failure_threshold {
            state.open_until =
                Some(Utc::now() + chrono::Duration::from_std(self.cooldown).unwrap_or_default());
            warn!(operation, "circuit opened after repeated failures");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(attempts: u32) -> Resilience {
        Resilience::new(
            attempts,
            Duration::from_millis(1),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn succeeds_first_try() {
        let resilience = policy(3);
        let result: Result<i32> = resilience.call("op", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let resilience = policy(3);
        let calls = AtomicU32::new(0);

        let result = resilience
            .call("op", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(PipelineError::Embedding("flaky".into()))
                } else {
                    Ok("recovered")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_config_errors() {
        let resilience = policy(3);
        let calls = AtomicU32::new(0);

        let result: Result<()> = resilience
            .call("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PipelineError::Config("bad".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_attempts_then_fails() {
        let resilience = policy(2);
        let calls = AtomicU32::new(0);

        let result: Result<()> = resilience
            .call("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PipelineError::Embedding("down".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn circuit_opens_after_threshold() {
        let resilience = policy(1).with_failure_threshold(2);

        for _ in 0..2 {
            let _: Result<()> = resilience
                .call("flaky-op", || async {
                    Err(PipelineError::Embedding("down".into()))
                })
                .await;
        }

        let result: Result<()> = resilience.call("flaky-op", || async { Ok(()) }).await;
        assert!(matches!(result, Err(PipelineError::CircuitOpen { .. })));
    }

    #[test]
    fn backoff_is_deterministic_and_grows() {
        let resilience = policy(3);
        let d1 = resilience.backoff_delay("op", 1);
        let d1_again = resilience.backoff_delay("op", 1);
        let d3 = resilience.backoff_delay("op", 3);

        assert_eq!(d1, d1_again);
        assert!(d3 > d1);
    }
}
