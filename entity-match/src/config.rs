//! Resolution options with sensible defaults.
//!
//! [`ResolveOptions`] controls result caps, the fuzzy threshold, the
//! remote decision gate and the remote time budget. The strong-match,
//! remote-default and tie-tolerance constants are hand-tuned and exposed
//! here as configuration rather than baked into the ranking code.

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::retry::RetryPolicy;

/// Options for a single resolution call.
///
/// Use [`Default::default()`] for the standard policy, or override fields
/// with struct update syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Cap on local-stage results.
    pub max_local_results: usize,
    /// Upper bound on the candidate pool requested from the store for
    /// fuzzy matching.
    pub fuzzy_pool_limit: usize,
    /// Cap on remote records considered for merging.
    pub max_remote_results: usize,
    /// Minimum composite score for a fuzzy local match.
    pub fuzzy_threshold: f64,
    /// Whether the remote stage may be used at all.
    pub use_remote_fallback: bool,
    /// Call the remote stage even when a strong local match exists.
    pub always_combine: bool,
    /// A local match scoring above this is "strong".
    pub strong_match_threshold: f64,
    /// Fixed score given to remote-only entries.
    pub remote_default_score: f64,
    /// Scores within this distance are ranked as ties.
    pub tie_tolerance: f64,
    /// Deadline for each remote attempt.
    pub remote_timeout_ms: u64,
    /// Caller-side retry around the remote executor.
    pub remote_retry: RetryPolicy,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_local_results: 20,
            fuzzy_pool_limit: 1000,
            max_remote_results: 10,
            fuzzy_threshold: 0.4,
            use_remote_fallback: true,
            always_combine: true,
            strong_match_threshold: 0.7,
            remote_default_score: 0.6,
            tie_tolerance: 0.1,
            remote_timeout_ms: 30_000,
            remote_retry: RetryPolicy::default(),
        }
    }
}

impl ResolveOptions {
    /// Validates these options, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `max_local_results` must be greater than 0
    /// - `fuzzy_pool_limit` must be greater than 0
    /// - `remote_timeout_ms` must be greater than 0
    /// - every threshold/score must lie in `[0, 1]`
    pub fn validate(&self) -> Result<(), ResolveError> {
        if self.max_local_results == 0 {
            return Err(ResolveError::Config(
                "max_local_results must be greater than 0".into(),
            ));
        }
        if self.fuzzy_pool_limit == 0 {
            return Err(ResolveError::Config(
                "fuzzy_pool_limit must be greater than 0".into(),
            ));
        }
        if self.remote_timeout_ms == 0 {
            return Err(ResolveError::Config(
                "remote_timeout_ms must be greater than 0".into(),
            ));
        }
        let unit_fields = [
            ("fuzzy_threshold", self.fuzzy_threshold),
            ("strong_match_threshold", self.strong_match_threshold),
            ("remote_default_score", self.remote_default_score),
            ("tie_tolerance", self.tie_tolerance),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ResolveError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Whether the remote stage is called regardless of local results.
    pub(crate) fn remote_unconditional(&self) -> bool {
        self.use_remote_fallback && self.always_combine
    }
}
