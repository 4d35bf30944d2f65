//! Resolver configuration, persisted as TOML.
//!
//! ```toml
//! log_dir = "/var/log/company-resolver"
//!
//! [store]
//! path = "/srv/companies.db"
//! pool_limit = 1000
//!
//! [provider]
//! kind = "http"
//! endpoint = "https://augment.example.com"
//! api_key_env = "COMPANY_RESOLVER_API_KEY"
//! rate_limit = { requests = 60, window = 60 }
//!
//! # Tried in order when the primary provider fails or finds nothing.
//! [[fallback_providers]]
//! kind = "fixture"
//! fixture_path = "/srv/companies.json"
//!
//! [resolve]
//! always_combine = false
//!
//! [cache]
//! ttl_secs = 300
//! ```
//!
//! Every section and field is optional; missing values take their defaults.

use std::path::{Path, PathBuf};

use entity_match::{RateLimit, ResolveOptions};
use serde::{Deserialize, Serialize};

use crate::app_dirs;
use crate::error::{ResolverError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directory for a daily rolling log file, in addition to stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    pub store: StoreConfig,
    pub provider: ProviderConfig,
    pub resolve: ResolveOptions,
    pub cache: CacheConfig,
    /// Providers tried after `provider`, in order. Their `rate_limit` is
    /// ignored: the primary's limit covers the whole chain.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fallback_providers: Vec<ProviderConfig>,
}

/// Local SQLite record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// Hard cap on the fuzzy candidate pool, whatever the caller asks for.
    pub pool_limit: usize,
    /// Hard cap on exact/substring matches per query.
    pub exact_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: app_dirs::default_db_path(),
            pool_limit: 1000,
            exact_limit: 100,
        }
    }
}

/// Which augmentation provider to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// JSON-over-HTTP augmentation service.
    Http,
    /// Offline records from a local JSON file.
    Fixture,
    /// Local-only resolution.
    #[default]
    Disabled,
}

/// Remote augmentation provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Base URL of the HTTP provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API key. The key
    /// itself is never stored in the config file.
    pub api_key_env: String,
    /// JSON file served by the fixture provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture_path: Option<PathBuf>,
    /// Connect/read timeout of the HTTP client in seconds. The per-call
    /// deadline is `resolve.remote_timeout_ms`.
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimit>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            endpoint: None,
            api_key_env: "COMPANY_RESOLVER_API_KEY".to_owned(),
            fixture_path: None,
            timeout_secs: 30,
            rate_limit: None,
        }
    }
}

impl ProviderConfig {
    /// Check the fields the selected kind needs. `section` prefixes error
    /// messages.
    fn validate(&self, section: &str) -> Result<()> {
        match self.kind {
            ProviderKind::Http => {
                let endpoint = self.endpoint.as_deref().ok_or_else(|| {
                    ResolverError::Config(format!("{section}.endpoint is required for kind = \"http\""))
                })?;
                url::Url::parse(endpoint).map_err(|e| {
                    ResolverError::Config(format!("{section}.endpoint is not a valid URL: {e}"))
                })?;
                if self.timeout_secs == 0 {
                    return Err(ResolverError::Config(format!(
                        "{section}.timeout_secs must be greater than 0"
                    )));
                }
            }
            ProviderKind::Fixture => {
                if self.fixture_path.is_none() {
                    return Err(ResolverError::Config(format!(
                        "{section}.fixture_path is required for kind = \"fixture\""
                    )));
                }
            }
            ProviderKind::Disabled => {}
        }
        Ok(())
    }
}

/// Process-level result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 600,
            capacity: 1000,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ResolverError::Config(e.to_string()))
    }

    /// Load from `path` if it exists, otherwise return the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ResolverError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/company-resolver/config.toml`.
    pub fn default_config_path() -> PathBuf {
        app_dirs::config_dir().join("config.toml")
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.resolve
            .validate()
            .map_err(|e| ResolverError::Config(e.to_string()))?;

        if self.store.pool_limit == 0 {
            return Err(ResolverError::Config(
                "store.pool_limit must be greater than 0".into(),
            ));
        }
        if self.store.exact_limit == 0 {
            return Err(ResolverError::Config(
                "store.exact_limit must be greater than 0".into(),
            ));
        }

        self.provider.validate("provider")?;
        if !self.fallback_providers.is_empty() && self.provider.kind == ProviderKind::Disabled {
            return Err(ResolverError::Config(
                "fallback_providers require an enabled [provider]".into(),
            ));
        }
        for (index, fallback) in self.fallback_providers.iter().enumerate() {
            fallback.validate(&format!("fallback_providers[{index}]"))?;
        }

        if let Some(limit) = self.provider.rate_limit {
            if limit.requests == 0 {
                return Err(ResolverError::Config(
                    "provider.rate_limit.requests must be greater than 0".into(),
                ));
            }
        }

        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(ResolverError::Config(
                "cache.capacity must be greater than 0 when the cache is enabled".into(),
            ));
        }
        Ok(())
    }
}
