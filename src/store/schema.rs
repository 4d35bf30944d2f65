//! SQLite DDL for the company record store.
//!
//! All `CREATE TABLE` / `CREATE INDEX` statements live here so they are
//! reviewable and testable in isolation.

use rusqlite::Connection;

/// Schema version written to `schema_meta` on first open.
pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Complete DDL for the company database.
///
/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
-- Enable WAL mode for concurrent reads during writes.
PRAGMA journal_mode = WAL;

-- Enforce foreign key constraints.
PRAGMA foreign_keys = ON;

-- Schema version tracking.
CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per company; mirrors CandidateRecord fields.
CREATE TABLE IF NOT EXISTS companies (
    id                  TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    legal_name          TEXT,
    employees           INTEGER,
    revenue             REAL,
    headquarters        TEXT,
    country             TEXT,
    region              TEXT,
    industry            TEXT,
    website             TEXT,
    description         TEXT,
    tech_stack          TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    year_founded        INTEGER,
    operating_countries TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    confidence          REAL NOT NULL DEFAULT 1.0,
    created_at          INTEGER NOT NULL DEFAULT 0,
    updated_at          INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_companies_name ON companies(name COLLATE NOCASE);

-- Other names a company is known by (former names, brands).
CREATE TABLE IF NOT EXISTS company_aliases (
    company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    alias      TEXT NOT NULL,
    PRIMARY KEY (company_id, alias)
);

CREATE INDEX IF NOT EXISTS idx_aliases_alias ON company_aliases(alias COLLATE NOCASE);
"#;

/// Apply the full schema to an open connection.
///
/// Safe to call multiple times. Inserts the current schema version into
/// `schema_meta` if not already present.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;
    Ok(())
}

/// Read the current schema version from the database.
///
/// Returns `None` if the key is missing.
pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_schema_creates_tables() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        apply_schema(&conn).expect("apply_schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .expect("prepare")
            .query_map([], |row| row.get(0))
            .expect("query")
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"companies".to_owned()));
        assert!(tables.contains(&"company_aliases".to_owned()));
        assert!(tables.contains(&"schema_meta".to_owned()));
    }

    #[test]
    fn apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        apply_schema(&conn).expect("first apply_schema");
        apply_schema(&conn).expect("second apply_schema (idempotent)");
    }

    #[test]
    fn schema_version_is_seeded_once() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        apply_schema(&conn).expect("apply");
        assert_eq!(
            read_schema_version(&conn).expect("read"),
            Some(CURRENT_SCHEMA_VERSION)
        );

        conn.execute(
            "UPDATE schema_meta SET value = '999' WHERE key = 'schema_version'",
            [],
        )
        .expect("bump version");
        apply_schema(&conn).expect("reapply");
        assert_eq!(read_schema_version(&conn).expect("read"), Some(999));
    }
}
