//! The resolution pipeline: local stage, decision gate, remote stage,
//! merge and rank.
//!
//! # Pipeline
//!
//! 1. Run the local stage against the record store (always)
//! 2. Decide whether the remote stage is needed
//! 3. Call the remote provider through the executor; failures are logged
//!    and the call degrades to local-only results
//! 4. Merge by identity key, enriching local entries in place
//! 5. Rescore against the live query and order with tie-breaking
//!
//! When the remote stage is unconditional (`use_remote_fallback` and
//! `always_combine` both set) steps 1 and 3 run concurrently.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::ResolveOptions;
use crate::error::{NormalizedError, ResolveError};
use crate::executor::{duration_to_ms, MetricsSnapshot, RemoteExecutor};
use crate::local::{search_local, LocalQuery};
use crate::retry::execute_with_retry;
use crate::source::{RecordStore, RemoteProvider};
use crate::types::{CandidateRecord, ResolvedCandidate};

use super::merge::{merge_results, sanitize_remote};
use super::ranking::{has_strong_local_match, rank, rescore};

/// Full outcome of one resolution call.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Final ranked list, unique by identity.
    pub candidates: Vec<ResolvedCandidate>,
    /// Candidates produced by the local stage.
    pub local_matches: usize,
    /// Remote records accepted after sanitizing.
    pub remote_matches: usize,
    /// Whether the remote provider was called.
    pub remote_invoked: bool,
    /// The swallowed remote failure, if any.
    pub remote_error: Option<NormalizedError>,
    pub elapsed_ms: u64,
}

impl Resolution {
    fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            local_matches: 0,
            remote_matches: 0,
            remote_invoked: false,
            remote_error: None,
            elapsed_ms: 0,
        }
    }
}

enum RemoteOutcome {
    Skipped,
    Records(Vec<CandidateRecord>),
    Failed(NormalizedError),
}

struct RemoteStage {
    provider: Arc<dyn RemoteProvider>,
    executor: RemoteExecutor,
}

/// Hybrid resolver over one record store and an optional remote provider.
///
/// Holds no per-call state; share it behind an `Arc` to serve concurrent
/// callers. The only state that crosses calls is the executor's health
/// counters.
pub struct Resolver {
    store: Arc<dyn RecordStore>,
    remote: Option<RemoteStage>,
}

impl Resolver {
    /// A local-only resolver.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            remote: None,
        }
    }

    /// Attach a remote provider behind a default executor.
    pub fn with_remote(self, provider: Arc<dyn RemoteProvider>) -> Self {
        let executor = RemoteExecutor::new(provider.id());
        self.with_remote_executor(provider, executor)
    }

    /// Attach a remote provider behind a preconfigured executor
    /// (e.g. one with a rate limit).
    pub fn with_remote_executor(
        mut self,
        provider: Arc<dyn RemoteProvider>,
        executor: RemoteExecutor,
    ) -> Self {
        self.remote = Some(RemoteStage { provider, executor });
        self
    }

    /// Health counters of the remote executor, if a provider is attached.
    pub fn remote_metrics(&self) -> Option<MetricsSnapshot> {
        self.remote.as_ref().map(|stage| stage.executor.metrics())
    }

    /// Resolve `query` into a ranked, deduplicated candidate list.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Config`] if `options` fail validation
    /// - [`ResolveError::StoreUnavailable`] if the record store fails
    ///
    /// Remote failures never surface here.
    pub async fn resolve(
        &self,
        query: &str,
        options: &ResolveOptions,
    ) -> Result<Vec<ResolvedCandidate>, ResolveError> {
        Ok(self.resolve_detailed(query, options).await?.candidates)
    }

    /// Like [`Resolver::resolve`], abandoning the call when `cancel` fires.
    ///
    /// Dropping the in-flight resolution drops both the store and the
    /// provider futures.
    pub async fn resolve_cancellable(
        &self,
        query: &str,
        options: &ResolveOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResolvedCandidate>, ResolveError> {
        Ok(self
            .resolve_detailed_cancellable(query, options, cancel)
            .await?
            .candidates)
    }

    /// Like [`Resolver::resolve_detailed`], abandoning the call when
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// [`ResolveError::Cancelled`] once `cancel` fires, otherwise the same
    /// as [`Resolver::resolve`].
    pub async fn resolve_detailed_cancellable(
        &self,
        query: &str,
        options: &ResolveOptions,
        cancel: &CancellationToken,
    ) -> Result<Resolution, ResolveError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("resolution cancelled by caller");
                Err(ResolveError::Cancelled)
            }
            result = self.resolve_detailed(query, options) => result,
        }
    }

    /// Resolve `query` and report how the result was produced.
    ///
    /// # Errors
    ///
    /// Same as [`Resolver::resolve`].
    pub async fn resolve_detailed(
        &self,
        query: &str,
        options: &ResolveOptions,
    ) -> Result<Resolution, ResolveError> {
        options.validate()?;
        let started = Instant::now();

        let query = query.trim();
        if query.is_empty() {
            return Ok(Resolution::empty());
        }
        tracing::trace!(query, "resolving");

        let params = LocalQuery {
            query,
            max_results: options.max_local_results,
            fuzzy_threshold: options.fuzzy_threshold,
            pool_limit: options.fuzzy_pool_limit,
        };

        let (local, remote) = if options.remote_unconditional() && self.remote.is_some() {
            // A store failure drops the remote future with it.
            futures::future::try_join(search_local(self.store.as_ref(), params), async {
                Ok::<_, ResolveError>(self.fetch_remote(query, options).await)
            })
            .await?
        } else {
            let local = search_local(self.store.as_ref(), params).await?;
            let strong = has_strong_local_match(&local, options.strong_match_threshold);
            let remote = if options.use_remote_fallback && (!strong || options.always_combine) {
                self.fetch_remote(query, options).await
            } else {
                tracing::debug!(strong, "remote stage skipped");
                RemoteOutcome::Skipped
            };
            (local, remote)
        };

        let local_matches = local.len();
        let (remote_records, remote_invoked, remote_error) = match remote {
            RemoteOutcome::Skipped => (Vec::new(), false, None),
            RemoteOutcome::Records(records) => (records, true, None),
            RemoteOutcome::Failed(err) => (Vec::new(), true, Some(err)),
        };
        let remote_matches = remote_records.len();

        let mut candidates = merge_results(local, remote_records, options.remote_default_score);
        rescore(&mut candidates, query, options.remote_default_score);
        let candidates = rank(candidates, options.tie_tolerance);

        let elapsed_ms = duration_to_ms(started.elapsed());
        tracing::info!(
            local = local_matches,
            remote = remote_matches,
            results = candidates.len(),
            remote_invoked,
            degraded = remote_error.is_some(),
            elapsed_ms,
            "resolution complete"
        );

        Ok(Resolution {
            candidates,
            local_matches,
            remote_matches,
            remote_invoked,
            remote_error,
            elapsed_ms,
        })
    }

    async fn fetch_remote(&self, query: &str, options: &ResolveOptions) -> RemoteOutcome {
        let Some(stage) = &self.remote else {
            return RemoteOutcome::Skipped;
        };

        let timeout = Duration::from_millis(options.remote_timeout_ms);
        let outcome = execute_with_retry(&stage.executor, &options.remote_retry, timeout, || {
            stage.provider.resolve(query)
        })
        .await;

        match outcome {
            Ok(done) => {
                let records = sanitize_remote(done.data, options.max_remote_results);
                tracing::debug!(
                    provider = %done.metadata.provider,
                    request_id = %done.metadata.request_id,
                    count = records.len(),
                    "remote stage returned"
                );
                RemoteOutcome::Records(records)
            }
            Err(err) => {
                tracing::warn!(
                    provider = %err.metadata.provider,
                    request_id = %err.metadata.request_id,
                    code = err.code(),
                    error = %err.message,
                    "remote stage failed, continuing with local results"
                );
                RemoteOutcome::Failed(err)
            }
        }
    }
}
