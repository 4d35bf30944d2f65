//! Stdin/stdout JSON bridge for the host command channel.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages from stdin,
//! dispatches them through the [`HostHandler`], and writes one
//! `ResponseEnvelope` line per command to stdout.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio_util::sync::CancellationToken;

use crate::error::ResolverError;
use crate::host::contract::{CommandEnvelope, CommandName, ResponseEnvelope};
use crate::host::handler::HostHandler;

/// Run the bridge over the process's stdin and stdout until stdin closes,
/// a `host.stop` command arrives, or `shutdown` fires.
///
/// # Errors
///
/// Returns [`ResolverError::Channel`] if stdin or stdout fail.
pub async fn run_stdio_bridge(handler: &HostHandler, shutdown: CancellationToken) -> crate::Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = BufWriter::new(tokio::io::stdout());
    run_bridge(handler, reader, writer, shutdown).await
}

/// Run the bridge over arbitrary line-oriented streams.
///
/// Commands are handled one at a time, so responses come back in request
/// order. `shutdown` also reaches the command in flight: a resolution still
/// running when it fires is answered with a cancellation error before the
/// bridge stops.
///
/// # Errors
///
/// Returns [`ResolverError::Channel`] on a read or write failure.
pub async fn run_bridge<R, W>(
    handler: &HostHandler,
    mut reader: R,
    mut writer: W,
    shutdown: CancellationToken,
) -> crate::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                tracing::info!("shutdown requested; stopping host bridge");
                break;
            }
            read = reader.read_line(&mut line) => read
                .map_err(|e| ResolverError::Channel(format!("failed to read from stdin: {e}")))?,
        };

        // EOF
        if bytes_read == 0 {
            tracing::info!("stdin closed (EOF); shutting down host bridge");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse command envelope");
                let response = ResponseEnvelope::error(
                    "parse-error",
                    format!("failed to parse command envelope: {e}"),
                );
                write_response(&mut writer, &response).await?;
                continue;
            }
        };

        let is_stop = envelope.command == CommandName::HostStop;
        let response = handler.handle(envelope, &shutdown).await;
        write_response(&mut writer, &response).await?;

        if is_stop {
            tracing::info!("host.stop received; shutting down host bridge");
            break;
        }
    }

    Ok(())
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &ResponseEnvelope,
) -> crate::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| ResolverError::Channel(format!("failed to serialize response: {e}")))?;
    write_line(writer, &json).await
}

/// Write a single JSON line and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> crate::Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| ResolverError::Channel(format!("failed to write to stdout: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| ResolverError::Channel(format!("failed to write newline to stdout: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| ResolverError::Channel(format!("failed to flush stdout: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use entity_match::{
        CandidateRecord, ProviderError, RecordStore, RemoteProvider, ResolveOptions, Resolver,
        StoreBatch, StoreError, StoredRecord,
    };

    use super::*;
    use crate::cache::CachedResolver;
    use crate::config::CacheConfig;

    struct OneRecord;

    #[async_trait]
    impl RecordStore for OneRecord {
        async fn search_exact(&self, _query: &str) -> Result<StoreBatch, StoreError> {
            Ok(StoreBatch::complete(vec![StoredRecord::new(
                "tc",
                CandidateRecord::named("TechCorp"),
            )]))
        }

        async fn search_pool(&self, _limit: usize) -> Result<StoreBatch, StoreError> {
            Ok(StoreBatch::complete(Vec::new()))
        }
    }

    /// Never answers.
    struct StalledProvider;

    #[async_trait]
    impl RemoteProvider for StalledProvider {
        fn id(&self) -> &str {
            "stalled"
        }

        async fn resolve(&self, _query: &str) -> Result<Vec<CandidateRecord>, ProviderError> {
            std::future::pending().await
        }
    }

    fn handler() -> HostHandler {
        let resolver = Arc::new(Resolver::new(Arc::new(OneRecord)));
        let cached = Arc::new(CachedResolver::new(resolver, &CacheConfig::default()));
        HostHandler::new(cached, ResolveOptions::default())
    }

    async fn run(input: &str) -> Vec<ResponseEnvelope> {
        let mut output = Vec::new();
        run_bridge(
            &handler(),
            input.as_bytes(),
            &mut output,
            CancellationToken::new(),
        )
        .await
        .expect("bridge");
        String::from_utf8(output)
            .expect("utf8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("response json"))
            .collect()
    }

    #[tokio::test]
    async fn one_response_per_command_in_order() {
        let responses = run(concat!(
            r#"{"request_id": "a", "query": "TechCorp"}"#,
            "\n\n",
            r#"{"request_id": "b", "command": "host.ping"}"#,
            "\n",
        ))
        .await;
        let ids: Vec<&str> = responses.iter().map(|r| r.request_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(responses.iter().all(|r| r.ok));
    }

    #[tokio::test]
    async fn parse_error_gets_a_response_and_bridge_continues() {
        let responses = run("{not json\n{\"request_id\": \"ok\", \"command\": \"host.ping\"}\n").await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].request_id, "parse-error");
        assert!(!responses[0].ok);
        assert!(responses[1].ok);
    }

    #[tokio::test]
    async fn stop_ends_the_session() {
        let responses = run(concat!(
            r#"{"request_id": "s", "command": "host.stop"}"#,
            "\n",
            r#"{"request_id": "after", "command": "host.ping"}"#,
            "\n",
        ))
        .await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].request_id, "s");
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_reading() {
        let token = CancellationToken::new();
        token.cancel();
        let mut output = Vec::new();
        run_bridge(
            &handler(),
            "{\"command\": \"host.ping\"}\n".as_bytes(),
            &mut output,
            token,
        )
        .await
        .expect("bridge");
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn shutdown_cancels_a_resolution_stuck_on_the_provider() {
        let resolver =
            Arc::new(Resolver::new(Arc::new(OneRecord)).with_remote(Arc::new(StalledProvider)));
        let cached = Arc::new(CachedResolver::new(resolver, &CacheConfig::default()));
        let handler = HostHandler::new(cached, ResolveOptions::default());

        let shutdown = CancellationToken::new();
        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let mut output = Vec::new();
        run_bridge(
            &handler,
            concat!(
                r#"{"request_id": "slow", "query": "TechCorp"}"#,
                "\n",
                r#"{"request_id": "next", "command": "host.ping"}"#,
                "\n",
            )
            .as_bytes(),
            &mut output,
            shutdown,
        )
        .await
        .expect("bridge");

        // The default remote deadline is 30s; shutdown must not wait for it.
        assert!(started.elapsed() < Duration::from_secs(5));
        let responses: Vec<ResponseEnvelope> = String::from_utf8(output)
            .expect("utf8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("response json"))
            .collect();
        assert_eq!(responses.len(), 1, "bridge stops after the cancelled command");
        assert_eq!(responses[0].request_id, "slow");
        assert!(!responses[0].ok);
        assert!(responses[0].error.as_deref().is_some_and(|e| e.contains("cancelled")));
    }
}
