//! Identity deduplication and additive field enrichment.
//!
//! Local candidates seed the result set. Each remote record is matched
//! against it by [`IdentityKey`]: unseen entities are appended as
//! `REMOTE`, and a match on a `LOCAL` entry enriches that entry in place
//! and flips it to `MERGED`. Enrichment only fills gaps; populated local
//! fields are never overwritten.

use crate::types::{clamp_unit, CandidateRecord, Origin, ResolvedCandidate};

use super::identity::IdentityKey;

/// Confidence assigned to remote records that report none.
pub const DEFAULT_REMOTE_CONFIDENCE: f64 = 0.8;

/// Clean up raw provider output before it is merged.
///
/// Records without a name are dropped. Names and text fields are trimmed,
/// non-positive head counts and revenue are discarded, and a zero
/// confidence is replaced by [`DEFAULT_REMOTE_CONFIDENCE`]. At most
/// `max_results` records are kept, in provider order.
pub fn sanitize_remote(records: Vec<CandidateRecord>, max_results: usize) -> Vec<CandidateRecord> {
    records
        .into_iter()
        .filter_map(sanitize_record)
        .take(max_results)
        .collect()
}

fn sanitize_record(mut record: CandidateRecord) -> Option<CandidateRecord> {
    let name = record.name.trim();
    if name.is_empty() {
        return None;
    }
    record.name = name.to_string();

    for field in [
        &mut record.legal_name,
        &mut record.headquarters,
        &mut record.country,
        &mut record.region,
        &mut record.industry,
        &mut record.website,
        &mut record.description,
    ] {
        *field = field
            .take()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
    }

    record.employees = record.employees.filter(|&n| n > 0);
    record.revenue = record.revenue.filter(|r| r.is_finite() && *r > 0.0);
    record.tech_stack.retain(|t| !t.trim().is_empty());
    record.operating_countries.retain(|c| !c.trim().is_empty());

    record.confidence = if record.confidence > 0.0 {
        clamp_unit(record.confidence)
    } else {
        DEFAULT_REMOTE_CONFIDENCE
    };
    Some(record)
}

/// Copy every field `incoming` knows and `target` lacks into `target`.
///
/// A text field counts as missing when absent or blank; lists are filled
/// only when empty. `confidence` becomes the larger of the two.
pub fn enrich(target: &mut CandidateRecord, incoming: CandidateRecord) {
    if target.name.trim().is_empty() && !incoming.name.trim().is_empty() {
        target.name = incoming.name;
    }

    fill_text(&mut target.legal_name, incoming.legal_name);
    fill_text(&mut target.headquarters, incoming.headquarters);
    fill_text(&mut target.country, incoming.country);
    fill_text(&mut target.region, incoming.region);
    fill_text(&mut target.industry, incoming.industry);
    fill_text(&mut target.website, incoming.website);
    fill_text(&mut target.description, incoming.description);

    fill(&mut target.employees, incoming.employees);
    fill(&mut target.revenue, incoming.revenue);
    fill(&mut target.year_founded, incoming.year_founded);

    fill_list(&mut target.tech_stack, incoming.tech_stack);
    fill_list(&mut target.operating_countries, incoming.operating_countries);

    target.confidence = clamp_unit(target.confidence.max(incoming.confidence));
}

fn fill<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if slot.is_none() {
        *slot = incoming;
    }
}

fn fill_text(slot: &mut Option<String>, incoming: Option<String>) {
    let missing = slot.as_deref().map_or(true, |s| s.trim().is_empty());
    if !missing {
        return;
    }
    if let Some(value) = incoming.filter(|v| !v.trim().is_empty()) {
        *slot = Some(value);
    }
}

fn fill_list(slot: &mut Vec<String>, incoming: Vec<String>) {
    if slot.is_empty() {
        *slot = incoming;
    }
}

/// Merge local candidates with remote records into one list unique by
/// identity.
///
/// Local entries sharing an identity keep the first occurrence. A remote
/// record matching an existing `MERGED` or `REMOTE` entry is dropped.
/// Identities stay pairwise distinct after every enrichment.
/// Output order is local order followed by appended remote entries; the
/// ranking pass decides the final order.
pub fn merge_results(
    local: Vec<ResolvedCandidate>,
    remote: Vec<CandidateRecord>,
    remote_default_score: f64,
) -> Vec<ResolvedCandidate> {
    let mut entries: Vec<(IdentityKey, ResolvedCandidate)> =
        Vec::with_capacity(local.len() + remote.len());

    for candidate in local {
        let key = IdentityKey::of(&candidate.record);
        if entries.iter().any(|(seen, _)| seen.same_entity(&key)) {
            tracing::debug!(identity = %key.primary(), "dropping duplicate local entry");
            continue;
        }
        entries.push((key, candidate));
    }

    let mut enriched = 0usize;
    let mut appended = 0usize;
    for record in remote {
        let key = IdentityKey::of(&record);
        let Some(index) = entries.iter().position(|(seen, _)| seen.same_entity(&key)) else {
            entries.push((key, ResolvedCandidate::remote(record, remote_default_score)));
            appended += 1;
            continue;
        };
        if entries[index].1.origin != Origin::Local {
            tracing::debug!(identity = %key.primary(), "dropping duplicate remote entry");
            continue;
        }
        absorb(&mut entries, index, record);
        enriched += 1;
    }

    tracing::debug!(enriched, appended, total = entries.len(), "merge complete");
    entries.into_iter().map(|(_, candidate)| candidate).collect()
}

/// Enrich the local entry at `index` with `record` and re-key it.
///
/// A website learned from the remote side sharpens the entry's identity.
/// When that sharper identity already belongs to another local or merged
/// entry the website is not taken, so no two entries ever share an
/// identity. Remote-only entries the new identity now covers are folded
/// into the entry and removed.
fn absorb(
    entries: &mut Vec<(IdentityKey, ResolvedCandidate)>,
    index: usize,
    record: CandidateRecord,
) {
    let previous_website = entries[index].1.record.website.clone();
    let target = &mut entries[index].1;
    enrich(&mut target.record, record);
    target.origin = Origin::Merged;

    let rekeyed = IdentityKey::of(&target.record);
    if rekeyed == entries[index].0 {
        return;
    }

    let claimed = entries.iter().enumerate().any(|(i, (seen, candidate))| {
        i != index && candidate.origin != Origin::Remote && seen.same_entity(&rekeyed)
    });
    if claimed {
        tracing::debug!(
            identity = %rekeyed.primary(),
            "learned website belongs to another entry, keeping the local identity"
        );
        entries[index].1.record.website = previous_website;
        entries[index].0 = IdentityKey::of(&entries[index].1.record);
        return;
    }

    entries[index].0 = rekeyed;
    fold_remote_duplicates(entries, index);
}

/// Fold every `REMOTE` entry sharing the identity of `entries[target]`
/// into it. The target already carries a website, so folding never
/// changes its key.
fn fold_remote_duplicates(
    entries: &mut Vec<(IdentityKey, ResolvedCandidate)>,
    mut target: usize,
) {
    let mut index = 0;
    while index < entries.len() {
        let duplicate = index != target
            && entries[index].1.origin == Origin::Remote
            && entries[index].0.same_entity(&entries[target].0);
        if !duplicate {
            index += 1;
            continue;
        }
        let (key, folded) = entries.remove(index);
        if index < target {
            target -= 1;
        }
        tracing::debug!(identity = %key.primary(), "folding remote entry into merged entry");
        enrich(&mut entries[target].1.record, folded.record);
    }
}
