//! Error types for the entity-match crate.
//!
//! Two families live here:
//!
//! - [`ResolveError`] is what a resolution call can fail with. Only local
//!   store failures, invalid options and caller cancellation are fatal.
//! - [`NormalizedError`] is the uniform shape every remote call failure is
//!   reduced to by the executor. Each carries a stable error code
//!   (SCREAMING_SNAKE_CASE) that is part of the public contract.

use crate::executor::ExecutionMetadata;

/// Stable error codes for normalized remote failures.
///
/// These codes never change. Match on [`ErrorKind`] or these constants
/// rather than parsing Display output.
pub mod error_codes {
    /// The provider could not be reached.
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";

    /// The call exceeded its time budget.
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";

    /// The provider (or the local request window) refused for rate reasons.
    pub const RATE_LIMIT_ERROR: &str = "RATE_LIMIT_ERROR";

    /// The provider rejected the request (4xx other than 429).
    pub const API_ERROR: &str = "API_ERROR";

    /// The provider failed internally (5xx).
    pub const SERVER_ERROR: &str = "SERVER_ERROR";

    /// Anything that could not be classified.
    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
}

/// Errors that abort a resolution call.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The local record store could not serve the request.
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    /// Invalid resolution options.
    #[error("config error: {0}")]
    Config(String),

    /// The caller abandoned the resolution before it completed.
    #[error("resolution cancelled")]
    Cancelled,
}

/// Convenience type alias for resolution results.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Failure reported by a [`RecordStore`](crate::source::RecordStore).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl From<StoreError> for ResolveError {
    fn from(err: StoreError) -> Self {
        Self::StoreUnavailable(err.0)
    }
}

/// Raw, unclassified failure reported by a
/// [`RemoteProvider`](crate::source::RemoteProvider).
///
/// Providers describe what went wrong as precisely as they can; the
/// executor turns it into a [`NormalizedError`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Connection-level failure (DNS, refused, reset).
    #[error("network failure: {0}")]
    Network(String),

    /// The provider's own client gave up waiting.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Anything else (decode failures, provider-specific errors).
    #[error("{0}")]
    Other(String),
}

/// Classified category of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Connection failure.
    Network,
    /// Deadline exceeded.
    Timeout,
    /// Rate limited (429, message match, or local request window).
    RateLimit,
    /// Client-side rejection (4xx except 429).
    Api,
    /// Server-side failure (5xx).
    Server,
    /// Catch-all.
    Unknown,
}

impl ErrorKind {
    /// Returns the stable code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network => error_codes::NETWORK_ERROR,
            Self::Timeout => error_codes::TIMEOUT_ERROR,
            Self::RateLimit => error_codes::RATE_LIMIT_ERROR,
            Self::Api => error_codes::API_ERROR,
            Self::Server => error_codes::SERVER_ERROR,
            Self::Unknown => error_codes::UNKNOWN_ERROR,
        }
    }

    /// Returns true if a caller may reasonably retry after this failure.
    ///
    /// Retryable: network, timeout, rate limit, server.
    /// Not retryable: API rejections and unclassified failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network | Self::Timeout | Self::RateLimit | Self::Server => true,
            Self::Api | Self::Unknown => false,
        }
    }

    /// Classify a raw provider failure.
    ///
    /// Checks run in a fixed order so that, e.g., a 504 whose message
    /// mentions "timeout" is reported as a timeout.
    pub fn classify(err: &ProviderError) -> Self {
        match err {
            ProviderError::Network(_) => Self::Network,
            ProviderError::Timeout(_) => Self::Timeout,
            ProviderError::Status { status, message } => {
                let lowered = message.to_lowercase();
                if lowered.contains("timeout") {
                    Self::Timeout
                } else if *status == 429 || lowered.contains("rate limit") {
                    Self::RateLimit
                } else if (400..500).contains(status) {
                    Self::Api
                } else if *status >= 500 {
                    Self::Server
                } else {
                    Self::Unknown
                }
            }
            ProviderError::Other(message) => {
                let lowered = message.to_lowercase();
                if lowered.contains("timeout") {
                    Self::Timeout
                } else if lowered.contains("rate limit") {
                    Self::RateLimit
                } else {
                    Self::Unknown
                }
            }
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A remote failure after classification.
///
/// The Display impl formats as `[CODE] message`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{}] {}", .kind.code(), .message)]
pub struct NormalizedError {
    /// Classified category.
    pub kind: ErrorKind,
    /// Human-readable description (never contains credentials).
    pub message: String,
    /// HTTP status, when the provider reported one.
    pub status: Option<u16>,
    /// Provider identity, timestamp and processing time of the attempt.
    pub metadata: ExecutionMetadata,
}

impl NormalizedError {
    /// Normalize a raw provider failure.
    pub fn from_provider(err: &ProviderError, metadata: ExecutionMetadata) -> Self {
        let status = match err {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        };
        Self {
            kind: ErrorKind::classify(err),
            message: err.to_string(),
            status,
            metadata,
        }
    }

    /// Build an error of a known kind that did not come from the provider
    /// (deadline expiry, local request window).
    pub fn new(kind: ErrorKind, message: impl Into<String>, metadata: ExecutionMetadata) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            metadata,
        }
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Returns true if a caller may retry.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
