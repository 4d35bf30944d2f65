//! In-memory cache of resolution results.
//!
//! Caches the final ranked candidate list keyed by the (normalised query,
//! options) pair. Uses [`moka`] for async-friendly caching with a TTL and
//! size-bounded eviction.
//!
//! Only clean results are cached: a resolution whose remote stage failed
//! is served once and then recomputed, so a transient provider outage
//! does not pin degraded answers for the whole TTL.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use entity_match::{ResolveOptions, ResolvedCandidate, Resolution, Resolver};
use moka::future::Cache;
use tokio_util::sync::CancellationToken;

use crate::config::CacheConfig;
use crate::error::Result;

/// Composite cache key: normalised query + options hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Lowercased, trimmed query string.
    query: String,
    /// Hash of the serialized options, so different thresholds or remote
    /// settings produce different entries.
    options_hash: u64,
}

impl CacheKey {
    pub fn new(query: &str, options: &ResolveOptions) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            options_hash: hash_options(options),
        }
    }
}

fn hash_options(options: &ResolveOptions) -> u64 {
    let mut hasher = DefaultHasher::new();
    // Options hold floats, so hash their canonical JSON form.
    serde_json::to_string(options)
        .unwrap_or_default()
        .hash(&mut hasher);
    hasher.finish()
}

/// Where a [`CachedResolution`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// Caching is disabled in configuration.
    Bypass,
}

/// A resolution result plus its cache provenance.
#[derive(Debug, Clone)]
pub struct CachedResolution {
    pub candidates: Vec<ResolvedCandidate>,
    pub status: CacheStatus,
    /// Present only when the resolution was computed by this call.
    pub detail: Option<Resolution>,
}

/// A [`Resolver`] fronted by an optional result cache.
pub struct CachedResolver {
    resolver: Arc<Resolver>,
    cache: Option<Cache<CacheKey, Vec<ResolvedCandidate>>>,
}

impl CachedResolver {
    pub fn new(resolver: Arc<Resolver>, config: &CacheConfig) -> Self {
        let cache = config.enabled.then(|| {
            Cache::builder()
                .max_capacity(config.capacity)
                .time_to_live(Duration::from_secs(config.ttl_secs))
                .build()
        });
        Self { resolver, cache }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Resolve through the cache. A computed resolution is abandoned as
    /// soon as `cancel` fires.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures, including cancellation; failures
    /// are never cached.
    pub async fn resolve(
        &self,
        query: &str,
        options: &ResolveOptions,
        cancel: &CancellationToken,
    ) -> Result<CachedResolution> {
        let Some(cache) = &self.cache else {
            let resolution = self
                .resolver
                .resolve_detailed_cancellable(query, options, cancel)
                .await?;
            return Ok(CachedResolution {
                candidates: resolution.candidates.clone(),
                status: CacheStatus::Bypass,
                detail: Some(resolution),
            });
        };

        let key = CacheKey::new(query, options);
        if let Some(candidates) = cache.get(&key).await {
            tracing::debug!(results = candidates.len(), "resolution cache hit");
            return Ok(CachedResolution {
                candidates,
                status: CacheStatus::Hit,
                detail: None,
            });
        }

        let resolution = self
            .resolver
            .resolve_detailed_cancellable(query, options, cancel)
            .await?;
        if resolution.remote_error.is_none() {
            cache.insert(key, resolution.candidates.clone()).await;
        }
        Ok(CachedResolution {
            candidates: resolution.candidates.clone(),
            status: CacheStatus::Miss,
            detail: Some(resolution),
        })
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }
}
