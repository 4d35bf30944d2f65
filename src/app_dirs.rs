//! Application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data (SQLite store) | `~/Library/Application Support/company-resolver/` | `~/.local/share/company-resolver/` |
//! | Config | `~/Library/Application Support/company-resolver/` | `~/.config/company-resolver/` |
//!
//! # Environment Overrides
//!
//! - `COMPANY_RESOLVER_DATA_DIR` overrides [`data_dir`]
//! - `COMPANY_RESOLVER_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

const APP_NAME: &str = "company-resolver";

/// Database filename within the data directory.
pub const DB_FILENAME: &str = "companies.db";

/// Application data root directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("COMPANY_RESOLVER_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/company-resolver-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("COMPANY_RESOLVER_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/company-resolver-config"))
}

/// Default SQLite store path (`data_dir()/companies.db`).
#[must_use]
pub fn default_db_path() -> PathBuf {
    data_dir().join(DB_FILENAME)
}
