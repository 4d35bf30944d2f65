//! Offline augmentation provider serving records from a JSON file.
//!
//! Useful for demos and for exercising the remote path without network
//! access. The file holds either a bare array of company records or the
//! same `{"companies": [...]}` envelope the HTTP service returns.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use entity_match::similarity::{DEFAULT_MAX_RESULTS, DEFAULT_THRESHOLD, Searchable, ranked_search};
use entity_match::{CandidateRecord, ProviderError, RemoteProvider};
use serde::Deserialize;

use crate::error::{ResolverError, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Bare(Vec<CandidateRecord>),
    Envelope { companies: Vec<CandidateRecord> },
}

struct FixtureEntry<'a>(&'a CandidateRecord);

impl Searchable for FixtureEntry<'_> {
    fn primary_name(&self) -> &str {
        &self.0.name
    }

    fn alternate_names(&self) -> Vec<&str> {
        self.0.legal_name.as_deref().into_iter().collect()
    }
}

/// Remote provider answering from an in-memory record list.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    records: Vec<CandidateRecord>,
    threshold: f64,
    latency: Duration,
}

impl FixtureProvider {
    pub fn new(records: Vec<CandidateRecord>) -> Self {
        Self {
            records,
            threshold: DEFAULT_THRESHOLD,
            latency: Duration::ZERO,
        }
    }

    /// Load records from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a record list.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: FixtureFile = serde_json::from_str(&content).map_err(|e| {
            ResolverError::Provider(format!("invalid fixture file {}: {e}", path.display()))
        })?;
        let records = match file {
            FixtureFile::Bare(records) | FixtureFile::Envelope { companies: records } => records,
        };
        tracing::debug!(count = records.len(), path = %path.display(), "fixture provider loaded");
        Ok(Self::new(records))
    }

    /// Minimum name score for a record to be returned.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Simulated response latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RemoteProvider for FixtureProvider {
    fn id(&self) -> &str {
        "fixture"
    }

    async fn resolve(&self, query: &str) -> std::result::Result<Vec<CandidateRecord>, ProviderError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.records.iter().map(FixtureEntry);
        Ok(ranked_search(entries, query, self.threshold, DEFAULT_MAX_RESULTS)
            .into_iter()
            .map(|scored| scored.item.0.clone())
            .collect())
    }
}
