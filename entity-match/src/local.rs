//! Local search stage: exact and fuzzy retrieval from the record store.
//!
//! Exact/substring hits come first with a score of 1.0, then fuzzy hits
//! from the bounded candidate pool, deduplicated by the store's native
//! identity. No network calls happen here; a store failure aborts the
//! stage with [`ResolveError::StoreUnavailable`].

use std::collections::HashSet;

use crate::error::ResolveError;
use crate::similarity::ranked_search;
use crate::source::{RecordStore, StoredRecord};
use crate::types::{MatchType, ResolvedCandidate};

/// Parameters for one local search.
#[derive(Debug, Clone, Copy)]
pub struct LocalQuery<'a> {
    pub query: &'a str,
    pub max_results: usize,
    pub fuzzy_threshold: f64,
    pub pool_limit: usize,
}

/// Run the local stage against `store`.
///
/// # Errors
///
/// Returns [`ResolveError::StoreUnavailable`] if either store call fails.
pub async fn search_local(
    store: &dyn RecordStore,
    params: LocalQuery<'_>,
) -> Result<Vec<ResolvedCandidate>, ResolveError> {
    let exact = store.search_exact(params.query).await?;
    if exact.truncated {
        tracing::debug!(count = exact.records.len(), "store truncated exact matches");
    }

    let pool = store.search_pool(params.pool_limit).await?;
    if pool.truncated {
        tracing::debug!(
            limit = params.pool_limit,
            "store truncated fuzzy candidate pool"
        );
    }

    // Over-fetch fuzzy hits so that dedup against exact hits still leaves
    // enough to fill the cap.
    let fuzzy = ranked_search(
        pool.records,
        params.query,
        params.fuzzy_threshold,
        params.max_results.saturating_mul(2),
    );

    let mut seen: HashSet<String> = HashSet::new();
    let mut results: Vec<ResolvedCandidate> = Vec::new();

    for stored in exact.records {
        if seen.insert(stored.id.clone()) {
            results.push(to_candidate(stored, 1.0, MatchType::Exact));
        }
    }
    let exact_count = results.len();

    for hit in fuzzy {
        if seen.insert(hit.item.id.clone()) {
            results.push(to_candidate(hit.item, hit.score, MatchType::Fuzzy));
        }
    }

    results.truncate(params.max_results);
    tracing::debug!(
        exact = exact_count,
        total = results.len(),
        "local stage complete"
    );
    Ok(results)
}

fn to_candidate(stored: StoredRecord, score: f64, match_type: MatchType) -> ResolvedCandidate {
    let alternates = stored.all_alternate_names();
    ResolvedCandidate::local(stored.id, stored.record, alternates, score, match_type)
}
