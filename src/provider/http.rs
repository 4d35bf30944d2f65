//! JSON-over-HTTP augmentation provider.
//!
//! `POST {endpoint}/v1/companies/resolve` with `{"query": "..."}` and an
//! optional bearer token. The service answers `{"companies": [...]}` with
//! camelCase company records. Transport failures and non-2xx statuses are
//! reported as raw [`ProviderError`]s; the executor classifies them.

use std::time::Duration;

use async_trait::async_trait;
use entity_match::{CandidateRecord, ProviderError, RemoteProvider};
use serde::{Deserialize, Serialize};

use crate::error::{ResolverError, Result};

const RESOLVE_PATH: &str = "/v1/companies/resolve";

#[derive(Debug, Serialize)]
struct ResolveRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    #[serde(default)]
    companies: Vec<serde_json::Value>,
}

/// Remote provider backed by an HTTP augmentation service.
pub struct HttpProvider {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpProvider {
    /// Build a provider for `endpoint` with a client-level `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Provider`] if the endpoint is not a valid
    /// URL or the HTTP client cannot be constructed.
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        url::Url::parse(endpoint)
            .map_err(|e| ResolverError::Provider(format!("invalid endpoint {endpoint}: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("company-resolver/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResolverError::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}{RESOLVE_PATH}", endpoint.trim_end_matches('/')),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Map a non-success status to a raw provider error.
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
        ProviderError::Status {
            status: status.as_u16(),
            message: extract_error_message(body),
        }
    }
}

/// Map a transport failure to a raw provider error.
fn map_transport_error(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(format!("request timed out: {err}"))
    } else if err.is_connect() || err.is_request() {
        ProviderError::Network(format!("request failed: {err}"))
    } else {
        ProviderError::Other(err.to_string())
    }
}

/// Extract an error message from an error response body.
///
/// Understands `{"error": {"message": ...}}` and `{"error": "..."}`,
/// falling back to the raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .get("message")
                .and_then(|m| m.as_str())
                .or_else(|| error.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Decode each company independently so one malformed entry does not
/// discard the whole response.
fn decode_companies(raw: Vec<serde_json::Value>) -> Vec<CandidateRecord> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<CandidateRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed company in provider response");
                None
            }
        })
        .collect()
}

#[async_trait]
impl RemoteProvider for HttpProvider {
    fn id(&self) -> &str {
        "http"
    }

    async fn resolve(&self, query: &str) -> std::result::Result<Vec<CandidateRecord>, ProviderError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&ResolveRequest { query });
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body_text));
        }

        let body: ResolveResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Other(format!("invalid response body: {e}")))?;
        Ok(decode_companies(body.companies))
    }
}
