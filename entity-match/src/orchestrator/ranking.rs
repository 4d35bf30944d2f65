//! Live-query rescoring and final ordering.
//!
//! Every `LOCAL`/`MERGED` entry is rescored against the live query:
//!
//! ```text
//! score = max(composite(name), composite(alternate)..., 0.8 * composite(domain))
//! ```
//!
//! `REMOTE` entries keep a fixed default score. Ordering is by descending
//! score, with scores inside the tie tolerance of a cluster's top score
//! ordered verified-first and then by match type.

use std::cmp::Ordering;

use crate::similarity::{composite_score, Searchable};
use crate::types::{clamp_unit, Origin, ResolvedCandidate};

use super::identity::normalize_website;

/// Weight applied to a match on the website domain rather than a name.
pub const DOMAIN_MATCH_WEIGHT: f64 = 0.8;

/// Slack for float noise when comparing score gaps to the tie tolerance.
const TIE_EPSILON: f64 = 1e-9;

impl Searchable for ResolvedCandidate {
    fn primary_name(&self) -> &str {
        &self.record.name
    }

    fn alternate_names(&self) -> Vec<&str> {
        self.alternate_names.iter().map(String::as_str).collect()
    }
}

/// Whether any local candidate scores strictly above `threshold`.
pub fn has_strong_local_match(local: &[ResolvedCandidate], threshold: f64) -> bool {
    local.iter().any(|c| c.match_score > threshold)
}

/// Score one verified candidate against `query`.
pub fn live_score(candidate: &ResolvedCandidate, query: &str) -> f64 {
    let by_name = candidate.best_score(query);
    let by_domain = candidate
        .record
        .website
        .as_deref()
        .and_then(normalize_website)
        .map_or(0.0, |domain| composite_score(&domain, query) * DOMAIN_MATCH_WEIGHT);
    clamp_unit(by_name.max(by_domain))
}

/// Recompute `match_score` for every candidate against the live query.
pub fn rescore(candidates: &mut [ResolvedCandidate], query: &str, remote_default_score: f64) {
    for candidate in candidates.iter_mut() {
        candidate.match_score = match candidate.origin {
            Origin::Local | Origin::Merged => live_score(candidate, query),
            Origin::Remote => clamp_unit(remote_default_score),
        };
    }
}

/// Order candidates for the caller.
///
/// Candidates are sorted by descending score, then grouped greedily: each
/// group starts at the highest remaining score and takes every following
/// candidate within `tie_tolerance` of it. Inside a group, verified
/// entries come before remote ones, then lower [`MatchType`] wins, then
/// higher score. Equal keys keep their incoming order.
///
/// [`MatchType`]: crate::types::MatchType
pub fn rank(mut candidates: Vec<ResolvedCandidate>, tie_tolerance: f64) -> Vec<ResolvedCandidate> {
    candidates.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));

    let mut ranked = Vec::with_capacity(candidates.len());
    let mut remaining = candidates.into_iter().peekable();
    while let Some(anchor) = remaining.next() {
        let top = anchor.match_score;
        let mut cluster = vec![anchor];
        while let Some(next) =
            remaining.next_if(|c| top - c.match_score <= tie_tolerance + TIE_EPSILON)
        {
            cluster.push(next);
        }
        cluster.sort_by(tie_break);
        ranked.extend(cluster);
    }
    ranked
}

fn tie_break(a: &ResolvedCandidate, b: &ResolvedCandidate) -> Ordering {
    b.origin
        .is_verified()
        .cmp(&a.origin.is_verified())
        .then_with(|| a.match_type.cmp(&b.match_type))
        .then_with(|| b.match_score.total_cmp(&a.match_score))
}
