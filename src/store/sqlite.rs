//! SQLite-backed company record store.
//!
//! Serves the resolver's two read paths (exact/substring search and the
//! fuzzy candidate pool) plus the writes needed to maintain the data set.
//! Both read paths are hard-capped and report truncation instead of
//! silently dropping rows.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use entity_match::{CandidateRecord, RecordStore, StoreBatch, StoreError, StoredRecord};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, params};

use super::schema::{apply_schema, read_schema_version};
use crate::error::{ResolverError, Result};

/// Columns selected for every company read, in `row_to_stored` order.
const COMPANY_COLUMNS: &str = "c.id, c.name, c.legal_name, c.employees, c.revenue, \
     c.headquarters, c.country, c.region, c.industry, c.website, c.description, \
     c.tech_stack, c.year_founded, c.operating_countries, c.confidence, \
     (SELECT json_group_array(a.alias) FROM company_aliases a WHERE a.company_id = c.id)";

/// Caps applied to the two read paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub exact_limit: usize,
    pub pool_limit: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            exact_limit: 100,
            pool_limit: 1000,
        }
    }
}

/// SQLite-backed [`RecordStore`].
///
/// Thread-safe via an internal `Mutex<Connection>`. Queries run on the
/// blocking thread pool so they never stall the async runtime.
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
    limits: StoreLimits,
}

impl SqliteRecordStore {
    /// Open (or create) the database at `path`, applying the schema.
    pub fn open(path: &Path, limits: StoreLimits) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn, limits)
    }

    /// A private in-memory database, mostly for tests.
    pub fn open_in_memory(limits: StoreLimits) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, limits)
    }

    fn from_connection(conn: Connection, limits: StoreLimits) -> Result<Self> {
        apply_schema(&conn)?;
        register_functions(&conn)?;
        tracing::debug!(
            version = ?read_schema_version(&conn)?,
            "company store opened"
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            limits,
        })
    }

    /// Caps applied to the read paths.
    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    /// Insert or replace a company and its aliases. Returns the id.
    ///
    /// A fresh id is generated when `id` is `None`.
    pub fn upsert(&self, id: Option<&str>, record: &CandidateRecord, aliases: &[String]) -> Result<String> {
        let id = id.map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_owned);
        let now = chrono::Utc::now().timestamp();
        let tech_stack = serde_json::to_string(&record.tech_stack).unwrap_or_else(|_| "[]".to_owned());
        let operating_countries =
            serde_json::to_string(&record.operating_countries).unwrap_or_else(|_| "[]".to_owned());
        let employees = record.employees.and_then(|n| i64::try_from(n).ok());

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO companies \
             (id, name, legal_name, employees, revenue, headquarters, country, region, \
              industry, website, description, tech_stack, year_founded, operating_countries, \
              confidence, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16) \
             ON CONFLICT(id) DO UPDATE SET \
              name = excluded.name, legal_name = excluded.legal_name, \
              employees = excluded.employees, revenue = excluded.revenue, \
              headquarters = excluded.headquarters, country = excluded.country, \
              region = excluded.region, industry = excluded.industry, \
              website = excluded.website, description = excluded.description, \
              tech_stack = excluded.tech_stack, year_founded = excluded.year_founded, \
              operating_countries = excluded.operating_countries, \
              confidence = excluded.confidence, updated_at = excluded.updated_at",
            params![
                id,
                record.name,
                record.legal_name,
                employees,
                record.revenue,
                record.headquarters,
                record.country,
                record.region,
                record.industry,
                record.website,
                record.description,
                tech_stack,
                record.year_founded,
                operating_countries,
                record.confidence,
                now,
            ],
        )?;
        tx.execute("DELETE FROM company_aliases WHERE company_id = ?1", params![id])?;
        for alias in aliases.iter().map(|a| a.trim()).filter(|a| !a.is_empty()) {
            tx.execute(
                "INSERT OR IGNORE INTO company_aliases (company_id, alias) VALUES (?1, ?2)",
                params![id, alias],
            )?;
        }
        tx.commit()?;
        Ok(id)
    }

    /// Delete a company. Returns whether a row was removed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM companies WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Fetch one company by id.
    pub fn get(&self, id: &str) -> Result<Option<StoredRecord>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies c WHERE c.id = ?1");
        let record = conn
            .query_row(&sql, params![id], row_to_stored)
            .optional()?;
        Ok(record)
    }

    /// Number of companies in the store.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM companies", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ResolverError::Store(format!("lock poisoned: {e}")))
    }

    /// Run a read on the blocking pool with the connection locked.
    async fn read<T, F>(&self, op: F) -> std::result::Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StoreError(format!("lock poisoned: {e}")))?;
            op(&guard).map_err(|e| StoreError(format!("SQLite error: {e}")))
        })
        .await
        .map_err(|e| StoreError(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn search_exact(&self, query: &str) -> std::result::Result<StoreBatch, StoreError> {
        let exact = query.trim().to_lowercase();
        let pattern = format!("%{}%", escape_like(&exact));
        let cap = self.limits.exact_limit;

        let mut records = self
            .read(move |conn| {
                let sql = format!(
                    "SELECT {COMPANY_COLUMNS} FROM companies c \
                     WHERE fold_case(c.name) LIKE ?1 ESCAPE '\\' \
                        OR fold_case(c.legal_name) LIKE ?1 ESCAPE '\\' \
                        OR EXISTS (SELECT 1 FROM company_aliases a \
                                   WHERE a.company_id = c.id \
                                     AND fold_case(a.alias) LIKE ?1 ESCAPE '\\') \
                     ORDER BY (fold_case(c.name) = ?2) DESC, length(c.name), c.id \
                     LIMIT ?3"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![pattern, exact, limit_param(cap)], row_to_stored)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await?;

        let truncated = records.len() > cap;
        records.truncate(cap);
        Ok(StoreBatch { records, truncated })
    }

    async fn search_pool(&self, limit: usize) -> std::result::Result<StoreBatch, StoreError> {
        let cap = limit.min(self.limits.pool_limit);

        let mut records = self
            .read(move |conn| {
                let sql = format!("SELECT {COMPANY_COLUMNS} FROM companies c ORDER BY c.id LIMIT ?1");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![limit_param(cap)], row_to_stored)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await?;

        let truncated = records.len() > cap;
        records.truncate(cap);
        Ok(StoreBatch { records, truncated })
    }
}

/// Register `fold_case(text)`, Unicode lower-casing for search
/// comparisons. SQLite's `lower()` and `LIKE` fold ASCII letters only, so
/// `SÃO` would otherwise miss `São`.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
    )
}

/// One extra row beyond `cap` so truncation can be detected.
fn limit_param(cap: usize) -> i64 {
    i64::try_from(cap.saturating_add(1)).unwrap_or(i64::MAX)
}

/// Escape `%`, `_` and the escape character itself for a LIKE pattern.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

fn row_to_stored(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRecord> {
    let id: String = row.get(0)?;
    let employees: Option<i64> = row.get(3)?;
    let tech_stack: String = row.get(11)?;
    let operating_countries: String = row.get(13)?;
    let aliases: Option<String> = row.get(15)?;

    let record = CandidateRecord {
        name: row.get(1)?,
        legal_name: row.get(2)?,
        employees: employees.and_then(|n| u64::try_from(n).ok()),
        revenue: row.get(4)?,
        headquarters: row.get(5)?,
        country: row.get(6)?,
        region: row.get(7)?,
        industry: row.get(8)?,
        website: row.get(9)?,
        description: row.get(10)?,
        tech_stack: decode_list(&id, "tech_stack", &tech_stack),
        year_founded: row.get(12)?,
        operating_countries: decode_list(&id, "operating_countries", &operating_countries),
        confidence: row.get(14)?,
    };

    let alternate_names = aliases
        .map(|json| decode_list(&id, "aliases", &json))
        .unwrap_or_default();
    let mut stored = StoredRecord::new(id, record);
    stored.alternate_names = alternate_names;
    Ok(stored)
}

/// Decode a JSON string-list column. A corrupt value is logged and read
/// as an empty list so one bad row cannot fail a whole search.
fn decode_list(id: &str, column: &'static str, raw: &str) -> Vec<String> {
    match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!(id, column, error = %e, "corrupt JSON list column, reading it as empty");
            Vec::new()
        }
    }
}
