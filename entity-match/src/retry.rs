//! Caller-side bounded retry around [`RemoteExecutor`].
//!
//! The executor itself never loops. Callers that want retries wrap it
//! here: only retryable failures are retried, with exponential backoff
//! plus jitter, and never more than `max_retries` extra attempts.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NormalizedError, ProviderError};
use crate::executor::{Executed, RemoteExecutor};

/// Default number of extra attempts (none: one attempt total).
pub const DEFAULT_MAX_RETRIES: u32 = 0;

/// Default base delay for exponential backoff in milliseconds.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;

/// Default maximum delay for exponential backoff in milliseconds.
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 4000;

/// Default backoff multiplier.
pub const DEFAULT_RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Retry policy for transient remote failures.
///
/// # Examples
///
/// ```
/// use entity_match::retry::RetryPolicy;
///
/// let policy = RetryPolicy::default().with_max_retries(2);
/// assert_eq!(policy.max_retries, 2);
/// assert_eq!(policy.delay_for_attempt(0).as_millis(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Extra attempts after the first (0 = no retries).
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Caps exponential growth.
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            backoff_multiplier: DEFAULT_RETRY_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Delay before retry number `attempt` (1-based; 0 means the first try).
    ///
    /// `min(base * multiplier^(attempt-1), max) + jitter`, jitter being up
    /// to 10% of the delay.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1).min(i32::MAX as u32) as i32);
        let delay = (self.base_delay_ms as f64 * exp).min(self.max_delay_ms as f64);
        let jitter = delay * (rand::random::<f64>() * 0.1);
        Duration::from_millis((delay + jitter) as u64)
    }
}

/// Run `operation` through `executor`, retrying retryable failures.
///
/// Each attempt gets the full `timeout`. Returns the first success, the
/// first non-retryable failure, or the last failure once retries run out.
pub async fn execute_with_retry<T, F, Fut>(
    executor: &RemoteExecutor,
    policy: &RetryPolicy,
    timeout: Duration,
    mut operation: F,
) -> Result<Executed<T>, NormalizedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match executor.execute(&mut operation, timeout).await {
            Ok(done) => return Ok(done),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for_attempt(attempt);
                tracing::debug!(
                    provider = executor.provider(),
                    code = err.code(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying remote call"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
