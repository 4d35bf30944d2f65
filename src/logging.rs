//! Tracing initialisation.
//!
//! All diagnostic output goes to stderr so that stdout stays a clean
//! protocol channel for the host bridge. When a log directory is
//! configured, a daily rolling file receives the same events.
//!
//! The filter comes from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "company_resolver=info,entity_match=info";

/// Prefix of the rolling log files (`company-resolver.log.YYYY-MM-DD`).
const LOG_FILE_PREFIX: &str = "company-resolver.log";

/// Install the global subscriber.
///
/// Returns the file writer's guard when `log_dir` is set; keep it alive
/// for the life of the process or buffered lines are lost on exit.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed or the
/// log directory cannot be created.
pub fn init(log_dir: Option<&Path>) -> crate::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::ResolverError::Config(format!("failed to install tracing subscriber: {e}")))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn init_creates_log_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_dir = dir.path().join("logs");
        // Another test may have installed a subscriber already; only the
        // directory side effect is asserted.
        let _ = init(Some(&log_dir));
        assert!(log_dir.is_dir());
    }
}
