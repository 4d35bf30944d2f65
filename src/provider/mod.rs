//! Augmentation providers selected by configuration.
//!
//! The `[provider]` section names the primary provider. Each
//! `[[fallback_providers]]` entry is tried after it, in file order, when
//! the providers before it fail or find nothing.

pub mod chain;
pub mod fixture;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use entity_match::{RemoteExecutor, RemoteProvider};

pub use chain::ChainProvider;
pub use fixture::FixtureProvider;
pub use http::HttpProvider;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{ResolverError, Result};

/// Build the configured provider chain, or `None` for local-only
/// resolution.
///
/// A disabled primary disables the remote stage whatever the fallbacks
/// say. With no fallbacks the primary is returned unwrapped.
///
/// # Errors
///
/// Returns [`ResolverError::Provider`] if any selected provider is missing
/// its endpoint or fixture file, or cannot be constructed.
pub fn from_config(
    primary: &ProviderConfig,
    fallbacks: &[ProviderConfig],
) -> Result<Option<Arc<dyn RemoteProvider>>> {
    let Some(first) = build(primary)? else {
        return Ok(None);
    };

    let mut providers = vec![first];
    for config in fallbacks {
        match build(config)? {
            Some(provider) => providers.push(provider),
            None => tracing::warn!("skipping disabled fallback provider"),
        }
    }

    let provider: Arc<dyn RemoteProvider> = if providers.len() == 1 {
        providers.remove(0)
    } else {
        Arc::new(ChainProvider::new(providers))
    };
    tracing::info!(provider = provider.id(), "augmentation provider configured");
    Ok(Some(provider))
}

fn build(config: &ProviderConfig) -> Result<Option<Arc<dyn RemoteProvider>>> {
    let provider: Arc<dyn RemoteProvider> = match config.kind {
        ProviderKind::Disabled => return Ok(None),
        ProviderKind::Http => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                ResolverError::Provider("http provider requires an endpoint".into())
            })?;
            let api_key = std::env::var(&config.api_key_env).ok();
            if api_key.is_none() {
                tracing::warn!(
                    env = %config.api_key_env,
                    "API key variable not set; calling provider without authorization"
                );
            }
            Arc::new(HttpProvider::new(
                endpoint,
                api_key,
                Duration::from_secs(config.timeout_secs),
            )?)
        }
        ProviderKind::Fixture => {
            let path = config.fixture_path.as_deref().ok_or_else(|| {
                ResolverError::Provider("fixture provider requires fixture_path".into())
            })?;
            Arc::new(FixtureProvider::from_file(path)?)
        }
    };
    Ok(Some(provider))
}

/// Executor for `provider` carrying the primary's rate limit. For a chain
/// the limit covers the whole chain.
pub fn executor_for(provider: &dyn RemoteProvider, config: &ProviderConfig) -> RemoteExecutor {
    let executor = RemoteExecutor::new(provider.id());
    match config.rate_limit {
        Some(limit) => executor.with_rate_limit(limit),
        None => executor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_builds_nothing() {
        let provider = from_config(&ProviderConfig::default(), &[]).expect("build");
        assert!(provider.is_none());
    }

    #[test]
    fn http_without_endpoint_is_rejected() {
        let config = ProviderConfig {
            kind: ProviderKind::Http,
            ..ProviderConfig::default()
        };
        assert!(matches!(from_config(&config, &[]), Err(ResolverError::Provider(_))));
    }

    #[test]
    fn http_with_endpoint_builds() {
        let config = ProviderConfig {
            kind: ProviderKind::Http,
            endpoint: Some("https://augment.example.com".into()),
            api_key_env: "COMPANY_RESOLVER_TEST_UNSET_KEY".into(),
            ..ProviderConfig::default()
        };
        let provider = from_config(&config, &[]).expect("build").expect("some");
        assert_eq!(provider.id(), "http");
    }

    #[test]
    fn fixture_provider_loads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fixture.json");
        std::fs::write(&path, r#"[{"name": "TechCorp"}]"#).expect("write");
        let config = ProviderConfig {
            kind: ProviderKind::Fixture,
            fixture_path: Some(path),
            ..ProviderConfig::default()
        };
        let provider = from_config(&config, &[]).expect("build").expect("some");
        assert_eq!(provider.id(), "fixture");
    }

    #[test]
    fn executor_carries_provider_id() {
        let provider = FixtureProvider::new(Vec::new());
        let executor = executor_for(&provider, &ProviderConfig::default());
        assert_eq!(executor.provider(), "fixture");
    }

    fn fixture_config(dir: &std::path::Path) -> ProviderConfig {
        let path = dir.join("fixture.json");
        std::fs::write(&path, r#"[{"name": "TechCorp"}]"#).expect("write");
        ProviderConfig {
            kind: ProviderKind::Fixture,
            fixture_path: Some(path),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn fallbacks_build_a_chain_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let primary = ProviderConfig {
            kind: ProviderKind::Http,
            endpoint: Some("https://augment.example.com".into()),
            api_key_env: "COMPANY_RESOLVER_TEST_UNSET_KEY".into(),
            ..ProviderConfig::default()
        };
        let fallbacks = [ProviderConfig::default(), fixture_config(dir.path())];

        let provider = from_config(&primary, &fallbacks).expect("build").expect("some");
        assert_eq!(provider.id(), "http>fixture");
    }

    #[test]
    fn disabled_primary_ignores_fallbacks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let provider = from_config(&ProviderConfig::default(), &[fixture_config(dir.path())])
            .expect("build");
        assert!(provider.is_none());
    }

    #[test]
    fn broken_fallback_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fallback = ProviderConfig {
            kind: ProviderKind::Http,
            ..ProviderConfig::default()
        };
        let result = from_config(&fixture_config(dir.path()), &[fallback]);
        assert!(matches!(result, Err(ResolverError::Provider(_))));
    }
}
