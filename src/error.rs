//! Error types for the company resolver.

use entity_match::ResolveError;

/// Top-level error type for the resolver service.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Configuration could not be loaded, saved or validated.
    #[error("config error: {0}")]
    Config(String),

    /// SQLite record store error.
    #[error("store error: {0}")]
    Store(String),

    /// Augmentation provider could not be constructed.
    #[error("provider error: {0}")]
    Provider(String),

    /// Resolution failed.
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Host protocol error (stdin/stdout).
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for ResolverError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(err.to_string())
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ResolverError>;
