//! Error handling for CamouSense Live

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Validation error (empty device address etc.)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication rejected by the backend (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request exceeded its bounded wait
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Upstream camera lost (HTTP 502 from the frame proxy or detection endpoint)
    #[error("Upstream lost: {0}")]
    UpstreamLost(String),

    /// Backend unreachable (transport-level failure, no response at all)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with an unexpected error status
    #[error("API error: {0}")]
    Api(String),

    /// Image or base64 decode failure
    #[error("Decode error: {0}")]
    Decode(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Cycle-failure classification used by the poller's error policy.
///
/// Timeouts are transient and tolerated silently up to the threshold,
/// auth failures are session-fatal, upstream losses escalate the
/// connectivity indicator without terminating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Auth,
    UpstreamLost,
    Other,
}

impl Error {
    /// Classify an error for the polling cycle's failure handler
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::Timeout(_) => FailureKind::Timeout,
            Error::Unauthorized(_) => FailureKind::Auth,
            Error::UpstreamLost(_) => FailureKind::UpstreamLost,
            Error::Http(e) if e.is_timeout() => FailureKind::Timeout,
            _ => FailureKind::Other,
        }
    }
}
