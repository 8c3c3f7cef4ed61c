//! Error classification.
//!
//! # Responsibilities
//! - Map a raw failure (HTTP status, message text, timeout flag) to an
//!   [`ApiError`] with a retryability decision
//! - Rewrite backend-runtime-down message variants to one stable string
//! - Prefer the backend's own error field over the transport message
//!
//! # Design Decisions
//! - An explicit retryable flag on the raw failure always wins
//! - 502/503/504 are retryable; every other status is deterministic
//! - Transport signatures are substring heuristics and stay configurable

use crate::config::ClassifierConfig;
use crate::error::{ApiError, ErrorKind};

/// Statuses treated as transient gateway trouble.
const RETRYABLE_STATUSES: [u16; 3] = [502, 503, 504];

/// Pure classifier over raw failure inputs.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    cfg: ClassifierConfig,
}

impl Classifier {
    pub fn new(cfg: ClassifierConfig) -> Self {
        Self { cfg }
    }

    /// Normalize a transport-level failure that never produced a response.
    pub fn classify_transport(&self, err: &reqwest::Error) -> ApiError {
        let raw = err.to_string();
        if err.is_timeout() {
            return self.normalize(ErrorKind::Timeout, &raw, None, Some(true));
        }
        let kind = if err.is_connect() {
            ErrorKind::Transport
        } else if err.is_decode() {
            ErrorKind::Decode
        } else {
            ErrorKind::Transport
        };
        let explicit = match kind {
            // Decode failures are deterministic; retrying re-reads the same body.
            ErrorKind::Decode => Some(false),
            _ => None,
        };
        self.classify_message(kind, &raw, None, explicit)
    }

    /// Normalize a non-success HTTP response.
    ///
    /// `body` is the raw response body; when it carries a JSON `error` (or
    /// `message`) field, that text wins over the generic `HTTP <code>` form.
    pub fn classify_status(&self, status: u16, body: &str) -> ApiError {
        let raw = extract_error_field(body)
            .or_else(|| short_text_body(body))
            .unwrap_or_else(|| format!("HTTP {status}"));
        let retryable = RETRYABLE_STATUSES.contains(&status);
        self.normalize(ErrorKind::Http, &raw, Some(status), Some(retryable))
    }

    /// Core classification: explicit flag wins, then retryable status, then
    /// message signatures.
    pub fn classify_message(
        &self,
        kind: ErrorKind,
        raw: &str,
        status: Option<u16>,
        explicit_retryable: Option<bool>,
    ) -> ApiError {
        let retryable = match explicit_retryable {
            Some(flag) => flag,
            None => match status {
                Some(code) => RETRYABLE_STATUSES.contains(&code),
                None => self.matches_transport(raw),
            },
        };
        self.normalize(kind, raw, status, Some(retryable))
    }

    fn normalize(
        &self,
        kind: ErrorKind,
        raw: &str,
        status: Option<u16>,
        retryable: Option<bool>,
    ) -> ApiError {
        let (kind, message, original) = if self.matches_runtime_down(raw) {
            (
                ErrorKind::RuntimeDown,
                self.cfg.runtime_down_message.clone(),
                Some(raw.to_string()),
            )
        } else {
            (kind, raw.to_string(), None)
        };
        let retryable = match kind {
            // Runtime-down is transient by definition.
            ErrorKind::RuntimeDown => true,
            _ => retryable.unwrap_or(false),
        };
        ApiError {
            message,
            original_message: original,
            status,
            retryable,
            kind,
        }
    }

    fn matches_transport(&self, raw: &str) -> bool {
        let lower = raw.to_lowercase();
        self.cfg
            .transport_signatures
            .iter()
            .any(|sig| lower.contains(sig.as_str()))
    }

    fn matches_runtime_down(&self, raw: &str) -> bool {
        let lower = raw.to_lowercase();
        self.cfg
            .runtime_down_signatures
            .iter()
            .any(|sig| lower.contains(sig.as_str()))
    }
}

/// Use a short plain-text body verbatim; long or markup bodies are dropped
/// so the caller falls back to the generic `HTTP <code>` form.
fn short_text_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.len() > 300 || trimmed.starts_with('<') {
        return None;
    }
    Some(trimmed.to_string())
}

/// Pull the backend's own error text out of a JSON body, if present.
fn extract_error_field(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for field in ["error", "message"] {
        if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
            if !text.is_empty() {
                return Some(text.to_string());
            }
        }
    }
    None
}
