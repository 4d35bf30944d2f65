//! Local company record store.
//!
//! [`SqliteRecordStore`] is the production [`RecordStore`]: a single
//! SQLite file holding the trusted company data set plus aliases.
//!
//! [`RecordStore`]: entity_match::RecordStore

mod schema;
pub mod sqlite;

use std::path::Path;

use entity_match::CandidateRecord;
use serde::Deserialize;

pub use sqlite::{SqliteRecordStore, StoreLimits};

use crate::error::{ResolverError, Result};

/// One entry of a JSON seed file: a company record plus its optional
/// store id and aliases.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(flatten)]
    pub record: CandidateRecord,
}

/// Load a JSON array of [`SeedRecord`]s into `store`. Returns the number
/// of records written.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or on the first
/// failed write.
pub fn import_json(store: &SqliteRecordStore, path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)?;
    let seeds: Vec<SeedRecord> = serde_json::from_str(&content)
        .map_err(|e| ResolverError::Store(format!("invalid seed file {}: {e}", path.display())))?;

    let mut written = 0;
    for seed in &seeds {
        if seed.record.name.trim().is_empty() {
            tracing::warn!(id = ?seed.id, "skipping seed record without a name");
            continue;
        }
        store.upsert(seed.id.as_deref(), &seed.record, &seed.aliases)?;
        written += 1;
    }
    tracing::info!(written, path = %path.display(), "seed file imported");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_json_writes_records_with_aliases() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("seed.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "tc", "name": "TechCorp Solutions", "website": "techcorp.com",
                 "aliases": ["TechCorp"], "confidence": 1.0},
                {"name": "Banco Digital SA", "techStack": ["java"]},
                {"name": "  "}
            ]"#,
        )
        .expect("write");

        let store = SqliteRecordStore::open_in_memory(StoreLimits::default()).expect("open");
        let written = import_json(&store, &path).expect("import");
        assert_eq!(written, 2);
        assert_eq!(store.count().expect("count"), 2);

        let tc = store.get("tc").expect("get").expect("present");
        assert_eq!(tc.alternate_names, vec!["TechCorp"]);
        assert_eq!(tc.record.website.as_deref(), Some("techcorp.com"));
    }

    #[test]
    fn import_json_rejects_malformed_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("seed.json");
        std::fs::write(&path, "{not json").expect("write");

        let store = SqliteRecordStore::open_in_memory(StoreLimits::default()).expect("open");
        assert!(matches!(
            import_json(&store, &path),
            Err(ResolverError::Store(_))
        ));
    }
}
