//! Command dispatch for the host bridge.

use std::sync::Arc;

use entity_match::{ResolveError, ResolveOptions, ResolvedCandidate};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheStatus, CachedResolver};
use crate::error::ResolverError;
use crate::host::contract::{
    CONTRACT_VERSION, CommandEnvelope, CommandName, ContractError, ResponseEnvelope,
};

/// Remote failure summary carried in a resolve response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoteErrorPayload {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolvePayload {
    candidates: Vec<ResolvedCandidate>,
    cache: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_matches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_matches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_invoked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_error: Option<RemoteErrorPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<u64>,
}

fn cache_label(status: CacheStatus) -> &'static str {
    match status {
        CacheStatus::Hit => "hit",
        CacheStatus::Miss => "miss",
        CacheStatus::Bypass => "bypass",
    }
}

/// Routes commands to the resolver.
pub struct HostHandler {
    resolver: Arc<CachedResolver>,
    defaults: ResolveOptions,
}

impl HostHandler {
    /// `defaults` are the configured options that per-command overrides
    /// are layered onto.
    pub fn new(resolver: Arc<CachedResolver>, defaults: ResolveOptions) -> Self {
        Self { resolver, defaults }
    }

    /// Handle one command. Never fails: every problem becomes an error
    /// response. A resolution in flight when `cancel` fires is abandoned
    /// and answered with a cancellation error.
    pub async fn handle(
        &self,
        envelope: CommandEnvelope,
        cancel: &CancellationToken,
    ) -> ResponseEnvelope {
        let request_id = envelope
            .request_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if let Err(e) = envelope.validate() {
            return ResponseEnvelope::error(request_id, e.to_string());
        }

        tracing::debug!(request_id = %request_id, command = envelope.command.as_str(), "host command");
        match envelope.command {
            CommandName::CompanyResolve => self.resolve(request_id, &envelope, cancel).await,
            CommandName::ProviderMetrics => {
                let metrics = self.resolver.resolver().remote_metrics();
                match serde_json::to_value(metrics) {
                    Ok(payload) => ResponseEnvelope::ok(request_id, payload),
                    Err(e) => ResponseEnvelope::error(request_id, e.to_string()),
                }
            }
            CommandName::CacheClear => {
                self.resolver.clear();
                ResponseEnvelope::ok(request_id, serde_json::json!({"cleared": true}))
            }
            CommandName::HostPing => {
                ResponseEnvelope::ok(request_id, serde_json::json!({"pong": true}))
            }
            CommandName::HostVersion => ResponseEnvelope::ok(
                request_id,
                serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "contract": CONTRACT_VERSION,
                }),
            ),
            CommandName::HostStop => {
                ResponseEnvelope::ok(request_id, serde_json::json!({"stopping": true}))
            }
        }
    }

    async fn resolve(
        &self,
        request_id: String,
        envelope: &CommandEnvelope,
        cancel: &CancellationToken,
    ) -> ResponseEnvelope {
        let Some(query) = envelope.query.as_deref() else {
            let err = ContractError::MissingQuery(CommandName::CompanyResolve.as_str());
            return ResponseEnvelope::error(request_id, err.to_string());
        };
        let options = match envelope.effective_options(&self.defaults) {
            Ok(options) => options,
            Err(e) => return ResponseEnvelope::error(request_id, e.to_string()),
        };

        let resolved = match self.resolver.resolve(query, &options, cancel).await {
            Ok(resolved) => resolved,
            Err(e @ ResolverError::Resolve(ResolveError::Cancelled)) => {
                tracing::info!(request_id = %request_id, "resolution cancelled by shutdown");
                return ResponseEnvelope::error(request_id, e.to_string());
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "resolution failed");
                return ResponseEnvelope::error(request_id, e.to_string());
            }
        };

        let detail = resolved.detail.as_ref();
        let payload = ResolvePayload {
            candidates: resolved.candidates,
            cache: cache_label(resolved.status),
            local_matches: detail.map(|d| d.local_matches),
            remote_matches: detail.map(|d| d.remote_matches),
            remote_invoked: detail.map(|d| d.remote_invoked),
            remote_error: detail.and_then(|d| d.remote_error.as_ref()).map(|e| {
                RemoteErrorPayload {
                    code: e.code(),
                    message: e.message.clone(),
                    status: e.status,
                }
            }),
            elapsed_ms: detail.map(|d| d.elapsed_ms),
        };
        match serde_json::to_value(payload) {
            Ok(payload) => ResponseEnvelope::ok(request_id, payload),
            Err(e) => ResponseEnvelope::error(request_id, e.to_string()),
        }
    }
}
