//! Collaborator interfaces consumed by the resolution engine.
//!
//! The engine never talks to a database or network directly. It is
//! parameterized at construction time by one [`RecordStore`] (the local,
//! trusted source) and optionally one [`RemoteProvider`] (augmentation).
//! Both must be `Send + Sync` so a single resolver can serve concurrent
//! calls.

use async_trait::async_trait;

use crate::error::{ProviderError, StoreError};
use crate::similarity::Searchable;
use crate::types::CandidateRecord;

/// A record as held by the local store, with its native identity.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Store-native primary key.
    pub id: String,
    pub record: CandidateRecord,
    /// Extra names to match against (the legal name is included
    /// automatically by [`Searchable`]).
    pub alternate_names: Vec<String>,
}

impl StoredRecord {
    pub fn new(id: impl Into<String>, record: CandidateRecord) -> Self {
        Self {
            id: id.into(),
            record,
            alternate_names: Vec::new(),
        }
    }

    /// Every alternate name including the legal name, without duplicates
    /// of the primary name.
    pub fn all_alternate_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let candidates = self
            .record
            .legal_name
            .iter()
            .chain(self.alternate_names.iter());
        for name in candidates {
            let trimmed = name.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(&self.record.name) {
                continue;
            }
            if !names.iter().any(|n| n == trimmed) {
                names.push(trimmed.to_string());
            }
        }
        names
    }
}

impl Searchable for StoredRecord {
    fn primary_name(&self) -> &str {
        &self.record.name
    }

    fn alternate_names(&self) -> Vec<&str> {
        self.record
            .legal_name
            .iter()
            .chain(self.alternate_names.iter())
            .map(String::as_str)
            .collect()
    }
}

/// A batch of records from the store.
///
/// `truncated` is set when the store capped the result; stores must never
/// drop records silently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreBatch {
    pub records: Vec<StoredRecord>,
    pub truncated: bool,
}

impl StoreBatch {
    pub fn complete(records: Vec<StoredRecord>) -> Self {
        Self {
            records,
            truncated: false,
        }
    }
}

/// The local record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records whose name (or legal name / alias) equals or contains
    /// `query`, ignoring case for all of Unicode, not just ASCII.
    async fn search_exact(&self, query: &str) -> Result<StoreBatch, StoreError>;

    /// A bounded pool of records used as the fuzzy-match universe.
    async fn search_pool(&self, limit: usize) -> Result<StoreBatch, StoreError>;
}

/// A remote augmentation provider.
///
/// No assumption is made about ordering or completeness of results.
#[async_trait]
pub trait RemoteProvider: Send + Sync {
    /// Stable provider identity, reported in execution metadata.
    fn id(&self) -> &str;

    /// Look up companies matching free text.
    async fn resolve(&self, query: &str) -> Result<Vec<CandidateRecord>, ProviderError>;
}
