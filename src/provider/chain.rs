//! Ordered provider fallback.
//!
//! Providers are asked in priority order. The first non-empty answer wins;
//! an empty answer or a failure moves on to the next provider. The chain
//! fails only when every provider failed, and then reports the last
//! failure so the executor classifies it like any single provider's.

use std::sync::Arc;

use async_trait::async_trait;
use entity_match::{CandidateRecord, ErrorKind, ProviderError, RemoteProvider};

/// A [`RemoteProvider`] that tries several providers in order.
pub struct ChainProvider {
    id: String,
    providers: Vec<Arc<dyn RemoteProvider>>,
}

impl ChainProvider {
    /// Chain `providers`, highest priority first. The chain's id joins the
    /// member ids with `>`, e.g. `http>fixture`.
    pub fn new(providers: Vec<Arc<dyn RemoteProvider>>) -> Self {
        let id = providers
            .iter()
            .map(|p| p.id())
            .collect::<Vec<_>>()
            .join(">");
        Self { id, providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl RemoteProvider for ChainProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn resolve(&self, query: &str) -> Result<Vec<CandidateRecord>, ProviderError> {
        let mut last_error = None;
        let mut answered = false;

        for (position, provider) in self.providers.iter().enumerate() {
            match provider.resolve(query).await {
                Ok(records) if !records.is_empty() => {
                    if position > 0 {
                        tracing::info!(
                            provider = provider.id(),
                            position,
                            "fallback provider answered"
                        );
                    }
                    return Ok(records);
                }
                Ok(_) => {
                    tracing::debug!(
                        provider = provider.id(),
                        "provider found nothing, trying next"
                    );
                    answered = true;
                }
                Err(err) => {
                    tracing::warn!(
                        provider = provider.id(),
                        code = ErrorKind::classify(&err).code(),
                        error = %err,
                        "provider failed, trying next"
                    );
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if !answered => Err(err),
            _ => Ok(Vec::new()),
        }
    }
}
