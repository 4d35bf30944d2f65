//! Resilient remote call executor.
//!
//! Wraps a single remote operation with a deadline, error normalization,
//! an optional request-window rate limit and process-local health
//! counters. Every outcome, success or failure, carries
//! [`ExecutionMetadata`].
//!
//! The executor performs exactly one attempt per [`RemoteExecutor::execute`]
//! call. Retrying is the caller's business (see [`crate::retry`]).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, NormalizedError, ProviderError};

/// Provider identity, completion time and latency of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub provider: String,
    /// Unique per attempt, for correlating log lines.
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: u64,
}

impl ExecutionMetadata {
    /// Start timing an attempt against `provider`.
    pub fn started(provider: impl Into<String>) -> AttemptTimer {
        AttemptTimer {
            provider: provider.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
            started: Instant::now(),
        }
    }
}

/// In-flight attempt; call [`AttemptTimer::finish`] to stamp it.
#[derive(Debug)]
pub struct AttemptTimer {
    provider: String,
    request_id: String,
    started: Instant,
}

impl AttemptTimer {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn finish(self) -> ExecutionMetadata {
        ExecutionMetadata {
            provider: self.provider,
            request_id: self.request_id,
            timestamp: Utc::now(),
            processing_time_ms: duration_to_ms(self.started.elapsed()),
        }
    }
}

/// A successful remote result with its metadata.
#[derive(Debug, Clone)]
pub struct Executed<T> {
    pub data: T,
    pub metadata: ExecutionMetadata,
}

/// At most `requests` attempts per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub requests: u32,
    #[serde(with = "duration_secs")]
    pub window: Duration,
}

#[derive(Debug)]
struct WindowState {
    requests: u32,
    window_start: Instant,
}

/// Snapshot of an executor's health counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub provider: String,
    pub request_count: u64,
    pub error_count: u64,
    /// `errors / (requests + errors)`, zero before the first attempt.
    pub error_rate: f64,
    pub last_processing_ms: u64,
}

#[derive(Debug, Default)]
struct ProviderMetrics {
    requests: AtomicU64,
    errors: AtomicU64,
    last_processing_ms: AtomicU64,
}

/// Executes remote operations against one provider.
///
/// Counters are monotonic and updated with relaxed ordering; they feed
/// health reporting only and never influence control flow.
#[derive(Debug)]
pub struct RemoteExecutor {
    provider: String,
    rate_limit: Option<RateLimit>,
    window: Mutex<WindowState>,
    metrics: ProviderMetrics,
}

impl RemoteExecutor {
    /// Create an executor for the named provider with no rate limit.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            rate_limit: None,
            window: Mutex::new(WindowState {
                requests: 0,
                window_start: Instant::now(),
            }),
            metrics: ProviderMetrics::default(),
        }
    }

    /// Refuse attempts beyond `limit` within its window.
    pub fn with_rate_limit(mut self, limit: RateLimit) -> Self {
        self.rate_limit = Some(limit);
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Run `operation` once, bounded by `timeout`.
    ///
    /// On deadline expiry the operation future is dropped (cancelling it)
    /// and a retryable `TIMEOUT_ERROR` is returned; the caller never waits
    /// longer than `timeout`. Provider failures are classified into a
    /// [`NormalizedError`].
    pub async fn execute<T, F, Fut>(
        &self,
        operation: F,
        timeout: Duration,
    ) -> Result<Executed<T>, NormalizedError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let timer = ExecutionMetadata::started(self.provider.clone());

        if let Some(reset_in) = self.acquire_slot() {
            self.metrics.errors.fetch_add(1, Ordering::Relaxed);
            let metadata = timer.finish();
            tracing::debug!(provider = %self.provider, ?reset_in, "request window exhausted");
            return Err(NormalizedError::new(
                ErrorKind::RateLimit,
                format!("rate limit exceeded, resets in {}s", reset_in.as_secs().max(1)),
                metadata,
            ));
        }

        tracing::trace!(
            provider = %self.provider,
            request_id = timer.request_id(),
            "remote call started"
        );
        let outcome = tokio::time::timeout(timeout, operation()).await;
        let metadata = timer.finish();

        match outcome {
            Ok(Ok(data)) => {
                self.metrics.requests.fetch_add(1, Ordering::Relaxed);
                self.metrics
                    .last_processing_ms
                    .store(metadata.processing_time_ms, Ordering::Relaxed);
                tracing::debug!(
                    provider = %self.provider,
                    request_id = %metadata.request_id,
                    elapsed_ms = metadata.processing_time_ms,
                    "remote call completed"
                );
                Ok(Executed { data, metadata })
            }
            Ok(Err(raw)) => {
                self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                let err = NormalizedError::from_provider(&raw, metadata);
                tracing::debug!(
                    provider = %self.provider,
                    request_id = %err.metadata.request_id,
                    code = err.code(),
                    "remote call failed"
                );
                Err(err)
            }
            Err(_elapsed) => {
                self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                Err(NormalizedError::new(
                    ErrorKind::Timeout,
                    format!("request timeout after {}ms", duration_to_ms(timeout)),
                    metadata,
                ))
            }
        }
    }

    /// Current health counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        let request_count = self.metrics.requests.load(Ordering::Relaxed);
        let error_count = self.metrics.errors.load(Ordering::Relaxed);
        let attempts = request_count + error_count;
        MetricsSnapshot {
            provider: self.provider.clone(),
            request_count,
            error_count,
            error_rate: if attempts == 0 {
                0.0
            } else {
                error_count as f64 / attempts as f64
            },
            last_processing_ms: self.metrics.last_processing_ms.load(Ordering::Relaxed),
        }
    }

    /// Take a slot in the current window. Returns the time until the
    /// window resets when no slot is left.
    fn acquire_slot(&self) -> Option<Duration> {
        let limit = self.rate_limit?;
        let mut state = self
            .window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let age = state.window_start.elapsed();
        if age >= limit.window {
            state.requests = 0;
            state.window_start = Instant::now();
        }

        if state.requests < limit.requests {
            state.requests += 1;
            None
        } else {
            Some(limit.window.saturating_sub(state.window_start.elapsed()))
        }
    }
}

/// Convert a [`Duration`] to whole milliseconds, saturating.
pub fn duration_to_ms(duration: Duration) -> u64 {
    duration.as_millis().try_into().unwrap_or(u64::MAX)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> RemoteExecutor {
        RemoteExecutor::new("mock")
    }

    #[test]
    fn attempt_keeps_its_request_id_when_finished() {
        let timer = ExecutionMetadata::started("mock");
        let request_id = timer.request_id().to_owned();
        assert!(uuid::Uuid::parse_str(&request_id).is_ok());

        let metadata = timer.finish();
        assert_eq!(metadata.request_id, request_id);
        assert_eq!(metadata.provider, "mock");
    }

    #[tokio::test]
    async fn success_carries_metadata_and_counts_request() {
        let exec = executor();
        let result = exec
            .execute(|| async { Ok::<_, ProviderError>(42) }, Duration::from_secs(1))
            .await
            .expect("should succeed");
        assert_eq!(result.data, 42);
        assert_eq!(result.metadata.provider, "mock");
        assert!(!result.metadata.request_id.is_empty());

        let metrics = exec.metrics();
        assert_eq!(metrics.request_count, 1);
        assert_eq!(metrics.error_count, 0);
        assert_eq!(metrics.error_rate, 0.0);
    }

    #[tokio::test]
    async fn failure_is_normalized_and_counted() {
        let exec = executor();
        let err = exec
            .execute(
                || async {
                    Err::<(), _>(ProviderError::Status {
                        status: 503,
                        message: "maintenance".into(),
                    })
                },
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Server);
        assert!(err.is_retryable());
        assert_eq!(err.metadata.provider, "mock");

        let metrics = exec.metrics();
        assert_eq!(metrics.request_count, 0);
        assert_eq!(metrics.error_count, 1);
        assert!((metrics.error_rate - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_yields_timeout_error() {
        let exec = executor();
        let err = exec
            .execute(
                || async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok::<_, ProviderError>(())
                },
                Duration::from_millis(50),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.code(), "TIMEOUT_ERROR");
        assert!(err.is_retryable());
        assert!(err.metadata.processing_time_ms < 60_000);
    }

    #[tokio::test]
    async fn exactly_one_attempt_per_call() {
        let exec = executor();
        let calls = AtomicU64::new(0);
        let _ = exec
            .execute(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ProviderError::Network("reset".into()))
                },
                Duration::from_secs(1),
            )
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_window_refuses_without_calling() {
        let exec = executor().with_rate_limit(RateLimit {
            requests: 1,
            window: Duration::from_secs(600),
        });
        let calls = AtomicU64::new(0);

        let first = exec
            .execute(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ProviderError>(())
                },
                Duration::from_secs(1),
            )
            .await;
        assert!(first.is_ok());

        let second = exec
            .execute(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ProviderError>(())
                },
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert_eq!(second.kind, ErrorKind::RateLimit);
        assert!(second.message.contains("resets in"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(exec.metrics().error_count, 1);
    }

    #[tokio::test]
    async fn window_resets_after_expiry() {
        let exec = executor().with_rate_limit(RateLimit {
            requests: 1,
            window: Duration::ZERO,
        });
        for _ in 0..3 {
            let result = exec
                .execute(|| async { Ok::<_, ProviderError>(()) }, Duration::from_secs(1))
                .await;
            assert!(result.is_ok());
        }
        assert_eq!(exec.metrics().request_count, 3);
    }

    #[test]
    fn rate_limit_serializes_window_as_seconds() {
        let limit = RateLimit {
            requests: 10,
            window: Duration::from_secs(60),
        };
        let json = serde_json::to_value(limit).expect("serialize");
        assert_eq!(json["window"], 60);
        let back: RateLimit = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, limit);
    }

    #[test]
    fn executor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RemoteExecutor>();
    }
}
