//! Access-token providers.
//!
//! # Responsibilities
//! - Resolve a token from any supported provider shape
//! - Validate the structural JWT shape before refresh/expiry logic applies

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

/// Source of the access token for a request.
///
/// Replaces the duck-typed string/function/object provider with an explicit
/// tagged union; [`TokenProvider::resolve`] is the single normalization
/// point.
#[derive(Clone)]
pub enum TokenProvider {
    /// Fixed token string.
    Static(String),
    /// Synchronous callback, e.g. reading from an in-memory session.
    Sync(Arc<dyn Fn() -> Option<String> + Send + Sync>),
    /// Asynchronous callback, e.g. reading from a keychain or IPC.
    Async(Arc<dyn Fn() -> BoxFuture<'static, Option<String>> + Send + Sync>),
}

impl TokenProvider {
    /// Resolve the current token, if any.
    pub async fn resolve(&self) -> Option<String> {
        let token = match self {
            Self::Static(token) => Some(token.clone()),
            Self::Sync(f) => f(),
            Self::Async(f) => f().await,
        };
        token.filter(|t| !t.is_empty())
    }
}

impl From<String> for TokenProvider {
    fn from(token: String) -> Self {
        Self::Static(token)
    }
}

impl From<&str> for TokenProvider {
    fn from(token: &str) -> Self {
        Self::Static(token.to_string())
    }
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(_) => f.write_str("TokenProvider::Static(..)"),
            Self::Sync(_) => f.write_str("TokenProvider::Sync(..)"),
            Self::Async(_) => f.write_str("TokenProvider::Async(..)"),
        }
    }
}

/// Structural JWT check: three non-empty dot-separated segments of URL-safe
/// base64 characters. No signature verification; shape only.
pub fn is_jwt_shaped(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|seg| {
            !seg.is_empty()
                && seg
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'=')
        })
}
