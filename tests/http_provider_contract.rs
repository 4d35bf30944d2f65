//! HTTP Provider Contract Tests
//!
//! These tests verify the wire format of the augmentation service client
//! and how its failures are classified once they pass through the
//! resolver's executor.

use std::sync::Arc;
use std::time::Duration;

use company_resolver::provider::{ChainProvider, FixtureProvider, HttpProvider};
use company_resolver::store::{SqliteRecordStore, StoreLimits};
use entity_match::{
    CandidateRecord, ErrorKind, Origin, ProviderError, RemoteProvider, ResolveOptions, Resolver,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESOLVE_PATH: &str = "/v1/companies/resolve";

fn provider(server: &MockServer) -> HttpProvider {
    HttpProvider::new(&server.uri(), Some("test-key".into()), Duration::from_secs(5))
        .expect("build provider")
}

fn empty_resolver(provider: HttpProvider) -> Resolver {
    let store = SqliteRecordStore::open_in_memory(StoreLimits::default()).expect("open store");
    Resolver::new(Arc::new(store)).with_remote(Arc::new(provider))
}

// ────────────────────────────────────────────────────────────────────────────
// Request Format
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_posts_query_with_bearer_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_json(json!({"query": "TechCorp"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"companies": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = provider(&mock_server).resolve("TechCorp").await;
    assert!(result.is_ok(), "request should match the mock: {result:?}");
}

#[tokio::test]
async fn test_request_without_key_sends_no_authorization() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"companies": []})))
        .mount(&mock_server)
        .await;

    let provider =
        HttpProvider::new(&mock_server.uri(), None, Duration::from_secs(5)).expect("build");
    provider.resolve("TechCorp").await.expect("resolve");

    let requests = mock_server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

// ────────────────────────────────────────────────────────────────────────────
// Response Parsing
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_response_companies_are_parsed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "companies": [
                {
                    "name": "TechCorp Solutions",
                    "legalName": "TechCorp Solutions Inc.",
                    "website": "https://www.techcorp.com",
                    "employees": 250,
                    "techStack": ["rust", "postgres"],
                    "confidence": 0.85
                },
                {"name": "TechCorp Labs"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let records = provider(&mock_server).resolve("TechCorp").await.expect("resolve");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].legal_name.as_deref(), Some("TechCorp Solutions Inc."));
    assert_eq!(records[0].employees, Some(250));
    assert_eq!(records[0].tech_stack, vec!["rust", "postgres"]);
    assert_eq!(records[1].name, "TechCorp Labs");
}

#[tokio::test]
async fn test_invalid_body_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server).resolve("TechCorp").await.unwrap_err();
    assert!(matches!(err, ProviderError::Other(_)), "got {err:?}");
}

#[tokio::test]
async fn test_remote_records_reach_resolution_output() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "companies": [{"name": "TechCorp", "website": "techcorp.com"}]
        })))
        .mount(&mock_server)
        .await;

    let resolver = empty_resolver(provider(&mock_server));
    let resolution = resolver
        .resolve_detailed("TechCorp", &ResolveOptions::default())
        .await
        .expect("resolve");

    assert!(resolution.remote_invoked);
    assert!(resolution.remote_error.is_none());
    assert_eq!(resolution.candidates.len(), 1);
    assert_eq!(resolution.candidates[0].origin, Origin::Remote);
}

// ────────────────────────────────────────────────────────────────────────────
// Error Classification
// ────────────────────────────────────────────────────────────────────────────

async fn classify_status(status: u16, body: serde_json::Value) -> ErrorKind {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&mock_server)
        .await;

    let resolver = empty_resolver(provider(&mock_server));
    let resolution = resolver
        .resolve_detailed("TechCorp", &ResolveOptions::default())
        .await
        .expect("remote failures never abort resolution");

    assert!(resolution.candidates.is_empty());
    let err = resolution.remote_error.expect("remote error recorded");
    assert_eq!(err.status, Some(status));
    err.kind
}

#[tokio::test]
async fn test_429_is_rate_limit() {
    let kind = classify_status(429, json!({"error": {"message": "slow down"}})).await;
    assert_eq!(kind, ErrorKind::RateLimit);
}

#[tokio::test]
async fn test_401_is_api_error() {
    let kind = classify_status(401, json!({"error": {"message": "invalid api key"}})).await;
    assert_eq!(kind, ErrorKind::Api);
}

#[tokio::test]
async fn test_500_is_server_error() {
    let kind = classify_status(500, json!({"error": "internal"})).await;
    assert_eq!(kind, ErrorKind::Server);
}

#[tokio::test]
async fn test_504_mentioning_timeout_is_timeout() {
    let kind = classify_status(504, json!({"error": {"message": "upstream timeout"}})).await;
    assert_eq!(kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn test_error_message_is_extracted_from_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"error": {"message": "plan does not include resolve"}})),
        )
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server).resolve("TechCorp").await.unwrap_err();
    match err {
        ProviderError::Status { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "plan does not include resolve");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_timeout_is_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"companies": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let provider =
        HttpProvider::new(&mock_server.uri(), None, Duration::from_millis(200)).expect("build");
    let err = provider.resolve("TechCorp").await.unwrap_err();
    assert!(matches!(err, ProviderError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn test_resolver_deadline_cuts_off_slow_service() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"companies": [{"name": "TechCorp"}]}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let resolver = empty_resolver(provider(&mock_server));
    let options = ResolveOptions {
        remote_timeout_ms: 100,
        ..ResolveOptions::default()
    };
    let resolution = resolver
        .resolve_detailed("TechCorp", &options)
        .await
        .expect("resolve");

    assert!(resolution.candidates.is_empty());
    let err = resolution.remote_error.expect("remote error recorded");
    assert_eq!(err.kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    // Port 1 is reserved and closed on test hosts.
    let provider =
        HttpProvider::new("http://127.0.0.1:1", None, Duration::from_secs(2)).expect("build");
    let err = provider.resolve("TechCorp").await.unwrap_err();
    assert!(matches!(err, ProviderError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_metrics_count_requests_and_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let resolver = empty_resolver(provider(&mock_server));
    for _ in 0..2 {
        resolver
            .resolve_detailed("TechCorp", &ResolveOptions::default())
            .await
            .expect("resolve");
    }

    let metrics = resolver.remote_metrics().expect("provider attached");
    assert_eq!(metrics.provider, "http");
    assert_eq!(metrics.error_count, 2);
}

// ────────────────────────────────────────────────────────────────────────────
// Fallback Chain
// ────────────────────────────────────────────────────────────────────────────

fn chained_resolver(server: &MockServer) -> Resolver {
    let fallback = FixtureProvider::new(vec![
        CandidateRecord::named("TechCorp").with_website("techcorp.com"),
    ]);
    let chain = ChainProvider::new(vec![Arc::new(provider(server)), Arc::new(fallback)]);
    let store = SqliteRecordStore::open_in_memory(StoreLimits::default()).expect("open store");
    Resolver::new(Arc::new(store)).with_remote(Arc::new(chain))
}

#[tokio::test]
async fn test_server_error_falls_through_to_fixture() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = chained_resolver(&mock_server);
    let resolution = resolver
        .resolve_detailed("TechCorp", &ResolveOptions::default())
        .await
        .expect("resolve");

    assert!(resolution.remote_error.is_none(), "{:?}", resolution.remote_error);
    assert_eq!(resolution.candidates.len(), 1);
    assert_eq!(resolution.candidates[0].record.name, "TechCorp");
    assert_eq!(resolution.candidates[0].origin, Origin::Remote);

    let metrics = resolver.remote_metrics().expect("provider attached");
    assert_eq!(metrics.provider, "http>fixture");
    assert_eq!(metrics.error_count, 0);
}

#[tokio::test]
async fn test_healthy_service_answers_without_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(RESOLVE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "companies": [{"name": "TechCorp Labs", "website": "techcorplabs.io"}]
        })))
        .mount(&mock_server)
        .await;

    let resolution = chained_resolver(&mock_server)
        .resolve_detailed("TechCorp", &ResolveOptions::default())
        .await
        .expect("resolve");

    let names: Vec<&str> = resolution
        .candidates
        .iter()
        .map(|c| c.record.name.as_str())
        .collect();
    assert_eq!(names, vec!["TechCorp Labs"]);
}
