//! Core record types shared by every stage of resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized company representation, identical regardless of origin.
///
/// Instances are built per call from collaborator responses and treated as
/// immutable inputs; only [`ResolvedCandidate`] is ever modified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employees: Option<u64>,
    /// Annual revenue in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headquarters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tech_stack: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_founded: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operating_countries: Vec<String>,
    /// Source confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
}

impl CandidateRecord {
    /// Create a record with only a name and zero confidence.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the website (builder style, mostly for tests and fixtures).
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    /// Set the description (builder style).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the confidence, clamped to `[0, 1]`.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_unit(confidence);
        self
    }
}

/// Where a resolved candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Origin {
    /// Found only in the local record store.
    Local,
    /// Found only through the remote augmentation provider.
    Remote,
    /// Local entry enriched with data from a matching remote entry.
    Merged,
}

impl Origin {
    /// Local and merged entries are backed by verified store data.
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Local | Self::Merged)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Remote => "REMOTE",
            Self::Merged => "MERGED",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a candidate matched the query.
///
/// Variant order is the tie-break order: lower wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Remote,
}

impl MatchType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Exact => "EXACT",
            Self::Fuzzy => "FUZZY",
            Self::Remote => "REMOTE",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A [`CandidateRecord`] plus resolution metadata.
///
/// Lives only for the duration of one resolution call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCandidate {
    #[serde(flatten)]
    pub record: CandidateRecord,
    pub origin: Origin,
    /// Non-owning back-reference to the local store's identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_record_id: Option<String>,
    /// Alternate names the store knows this entity by (never serialized
    /// back to callers; used for scoring only).
    #[serde(skip)]
    pub alternate_names: Vec<String>,
    /// Relevance to the live query in `[0, 1]`.
    pub match_score: f64,
    pub match_type: MatchType,
}

impl ResolvedCandidate {
    /// Wrap a local store record.
    pub fn local(
        id: impl Into<String>,
        record: CandidateRecord,
        alternate_names: Vec<String>,
        match_score: f64,
        match_type: MatchType,
    ) -> Self {
        Self {
            record,
            origin: Origin::Local,
            source_record_id: Some(id.into()),
            alternate_names,
            match_score: clamp_unit(match_score),
            match_type,
        }
    }

    /// Wrap a remote provider record with the given fixed score.
    pub fn remote(record: CandidateRecord, match_score: f64) -> Self {
        Self {
            record,
            origin: Origin::Remote,
            source_record_id: None,
            alternate_names: Vec::new(),
            match_score: clamp_unit(match_score),
            match_type: MatchType::Remote,
        }
    }
}

/// Clamp a score into `[0, 1]`, mapping NaN to 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
