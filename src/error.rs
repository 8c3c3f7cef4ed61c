//! Normalized error type for the client boundary.
//!
//! # Responsibilities
//! - Represent every failure a caller can observe
//! - Carry the HTTP status and the retryability decision
//! - Preserve the raw message when classification rewrote it
//!
//! # Design Decisions
//! - Raw transport/SDK errors never escape the executor; they are normalized
//!   exactly once at that boundary
//! - Retryability is carried on the error so callers and the monitor do not
//!   re-derive it

use thiserror::Error;

/// Broad failure class, aligned with the retry taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection-level failure (refused, reset, DNS, broken pipe).
    Transport,
    /// The attempt hit its deadline.
    Timeout,
    /// Gateway reachable, execution runtime behind it is not.
    RuntimeDown,
    /// Non-success HTTP status.
    Http,
    /// Response body could not be decoded.
    Decode,
    /// Client-side misconfiguration (bad base URL, bad TLS setup).
    Config,
}

/// Normalized client error.
///
/// One instance is produced per failure boundary; callers never see a raw
/// `reqwest::Error`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    /// User-visible message, possibly rewritten to a stable form.
    pub message: String,

    /// Raw message, present only when `message` was rewritten.
    pub original_message: Option<String>,

    /// HTTP status, when the failure carried one.
    pub status: Option<u16>,

    /// Whether the request executor may retry this failure.
    pub retryable: bool,

    /// Failure class.
    pub kind: ErrorKind,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            original_message: None,
            status: None,
            retryable: false,
            kind,
        }
    }

    /// Alias for `status`, kept for callers that read `statusCode`.
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// True when the failure never reached the HTTP layer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Transport | ErrorKind::Timeout | ErrorKind::RuntimeDown
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_message() {
        let err = ApiError::new(ErrorKind::Http, "HTTP 418").with_status(418);
        assert_eq!(err.to_string(), "HTTP 418");
        assert_eq!(err.status_code(), Some(418));
    }

    #[test]
    fn test_transport_classes() {
        assert!(ApiError::new(ErrorKind::Timeout, "t").is_transport());
        assert!(ApiError::new(ErrorKind::RuntimeDown, "r").is_transport());
        assert!(!ApiError::new(ErrorKind::Http, "h").is_transport());
    }
}
