//! Headless resolver binary for stdin/stdout JSON communication.
//!
//! Reads `CommandEnvelope` messages as newline-delimited JSON from stdin,
//! resolves them against the configured SQLite store and augmentation
//! provider, and writes `ResponseEnvelope` messages to stdout.
//!
//! ```text
//! company-resolver-host [--config <path>] [--import <seed.json>]
//! ```
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use company_resolver::cache::CachedResolver;
use company_resolver::config::ResolverConfig;
use company_resolver::host::{HostHandler, run_stdio_bridge};
use company_resolver::store::{SqliteRecordStore, StoreLimits, import_json};
use company_resolver::{logging, provider};
use entity_match::Resolver;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    import: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                args.config = Some(iter.next().context("--config requires a path")?.into());
            }
            "--import" => {
                args.import = Some(iter.next().context("--import requires a path")?.into());
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => ResolverConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ResolverConfig::load_or_default(&ResolverConfig::default_config_path())?,
    };
    config.validate()?;

    // Keep the file writer alive for the life of the process.
    let _log_guard = logging::init(config.log_dir.as_deref())?;
    tracing::info!("company-resolver-host starting");

    let limits = StoreLimits {
        exact_limit: config.store.exact_limit,
        pool_limit: config.store.pool_limit,
    };
    let store = SqliteRecordStore::open(&config.store.path, limits)
        .with_context(|| format!("failed to open store {}", config.store.path.display()))?;
    if let Some(seed) = &args.import {
        import_json(&store, seed)?;
    }
    tracing::info!(
        records = store.count()?,
        path = %config.store.path.display(),
        exact_limit = store.limits().exact_limit,
        pool_limit = store.limits().pool_limit,
        "record store ready"
    );

    let mut resolver = Resolver::new(Arc::new(store));
    if let Some(remote) = provider::from_config(&config.provider, &config.fallback_providers)? {
        let executor = provider::executor_for(remote.as_ref(), &config.provider);
        resolver = resolver.with_remote_executor(remote, executor);
    }
    let cached = Arc::new(CachedResolver::new(Arc::new(resolver), &config.cache));
    let handler = HostHandler::new(cached, config.resolve.clone());

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    run_stdio_bridge(&handler, shutdown).await.map_err(|e| {
        tracing::error!(error = %e, "company-resolver-host exited with error");
        anyhow::anyhow!("company-resolver-host failed: {e}")
    })?;

    tracing::info!("company-resolver-host shut down cleanly");
    Ok(())
}
