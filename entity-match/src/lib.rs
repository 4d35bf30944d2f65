//! # entity-match
//!
//! Hybrid company entity resolution.
//!
//! Given a free-text company query, this crate returns a ranked,
//! deduplicated list of candidate records by combining fuzzy matching
//! against a local record store with an optional remote augmentation
//! provider. It performs no I/O of its own: both collaborators are
//! injected as trait objects when the [`Resolver`] is built.
//!
//! ## Design
//!
//! - Local data is ground truth: store failures abort the call
//! - Remote failures are classified, logged and absorbed; the caller still
//!   gets local results
//! - Every remote attempt runs under a deadline and carries metadata
//! - Records found in both sources are merged field by field, never
//!   losing a locally known value
//! - Ranking reflects the live query and prefers verified data on ties
//!
//! ## Security
//!
//! - Queries are logged only at trace level
//! - Remote records are sanitized before they are merged

pub mod config;
pub mod error;
pub mod executor;
pub mod local;
pub mod orchestrator;
pub mod retry;
pub mod similarity;
pub mod source;
pub mod types;

pub use config::ResolveOptions;
pub use error::{ErrorKind, NormalizedError, ProviderError, ResolveError, Result, StoreError};
pub use executor::{ExecutionMetadata, MetricsSnapshot, RateLimit, RemoteExecutor};
pub use orchestrator::{Resolution, Resolver};
pub use retry::RetryPolicy;
pub use similarity::{composite_score, edit_distance, ranked_search, similarity};
pub use source::{RecordStore, RemoteProvider, StoreBatch, StoredRecord};
pub use types::{CandidateRecord, MatchType, Origin, ResolvedCandidate};

/// Resolve a company query with default options.
///
/// Convenience wrapper around [`Resolver::resolve`] using
/// [`ResolveOptions::default()`].
///
/// # Errors
///
/// Returns [`ResolveError::StoreUnavailable`] if the record store fails.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # async fn example(store: Arc<dyn entity_match::RecordStore>) -> entity_match::Result<()> {
/// let resolver = entity_match::Resolver::new(store);
/// let results = entity_match::resolve_default(&resolver, "techcorp").await?;
/// for candidate in &results {
///     println!("{} ({}) {:.2}", candidate.record.name, candidate.origin, candidate.match_score);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn resolve_default(resolver: &Resolver, query: &str) -> Result<Vec<ResolvedCandidate>> {
    resolver.resolve(query, &ResolveOptions::default()).await
}
