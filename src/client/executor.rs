//! Authenticated request executor.
//!
//! # Responsibilities
//! - Resolve the primary and legacy endpoint paths
//! - Run the retry loop with jittered backoff
//! - Recover from 401 via single-flight session refresh, retrying once
//! - Normalize every failure exactly once at this boundary
//!
//! # Design Decisions
//! - Retries for one logical call are strictly sequential
//! - A 404 on the primary path triggers one uncounted legacy-path attempt;
//!   any other primary outcome short-circuits
//! - The refresh-and-retry-once path is independent of the retry policy; an
//!   explicit `Disabled` override does not suppress it

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::auth::{is_jwt_shaped, RefreshCoordinator, SessionRefresher, SessionStore, TokenProvider};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult, ErrorKind};
use crate::resilience::{compute_retry_delay_ms, resolve_policy, Classifier, RetryOverride};

/// Whether a 401 may trigger session-refresh and soft-expiry side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Normal data call; 401 drives refresh/expiry handling.
    Business,
    /// Health probe; 401 is surfaced untouched.
    Probe,
}

/// Request payload.
#[derive(Debug, Clone)]
pub enum Payload {
    None,
    /// Query-string parameters (GET).
    Query(Vec<(String, String)>),
    /// JSON body (POST).
    Json(Value),
}

/// Executes one authenticated backend call with retries and 401 recovery.
pub struct RequestExecutor {
    http: reqwest::Client,
    config: ClientConfig,
    classifier: Classifier,
    session: Arc<SessionStore>,
    refresh: RefreshCoordinator,
}

impl RequestExecutor {
    pub fn new(
        config: ClientConfig,
        session: Arc<SessionStore>,
        refresher: Arc<dyn SessionRefresher>,
    ) -> ApiResult<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            ApiError::new(
                ErrorKind::Config,
                format!("invalid base URL '{}': {}", config.base_url, e),
            )
        })?;
        let http = reqwest::Client::builder().build().map_err(|e| {
            ApiError::new(ErrorKind::Config, format!("failed to build HTTP client: {e}"))
        })?;
        let classifier = Classifier::new(config.classifier.clone());
        Ok(Self {
            http,
            config,
            classifier,
            session,
            refresh: RefreshCoordinator::new(refresher),
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Execute one call: resolve the token, run the retry loop, recover from
    /// 401 on business requests.
    pub async fn execute(
        &self,
        method: Method,
        slug: &str,
        payload: Payload,
        token: &TokenProvider,
        retry: Option<RetryOverride>,
        kind: RequestKind,
    ) -> ApiResult<Value> {
        self.execute_with_status(method, slug, payload, token, retry, kind)
            .await
            .map(|(_, value)| value)
    }

    /// Like [`execute`](Self::execute), but also reports the HTTP status of
    /// the successful response. The probe path needs it; data callers mostly
    /// do not.
    pub async fn execute_with_status(
        &self,
        method: Method,
        slug: &str,
        payload: Payload,
        token: &TokenProvider,
        retry: Option<RetryOverride>,
        kind: RequestKind,
    ) -> ApiResult<(u16, Value)> {
        let token = token.resolve().await;
        let policy = resolve_policy(&method, retry);
        let mut attempt: u32 = 0;

        loop {
            match self.dispatch(&method, slug, &payload, token.as_deref()).await {
                Ok(response) => {
                    if kind == RequestKind::Business {
                        if let Some(t) = token.as_deref() {
                            if is_jwt_shaped(t) {
                                self.session.clear_soft_expired();
                            }
                        }
                    }
                    return Ok(response);
                }
                Err(err) if err.status == Some(401) && kind == RequestKind::Business => {
                    return self
                        .recover_unauthorized(&method, slug, &payload, token.as_deref(), err)
                        .await;
                }
                Err(err) => {
                    if !err.retryable || attempt >= policy.max_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = compute_retry_delay_ms(&policy, attempt);
                    tracing::debug!(
                        slug,
                        attempt,
                        delay_ms = delay,
                        error = %err,
                        "retrying request"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    /// 401 recovery for business requests: single-flight refresh, then one
    /// retry with the new token. A second 401 never triggers another refresh,
    /// and a soft-expired session skips the refresh attempt entirely until a
    /// successful sign-in clears the flag.
    async fn recover_unauthorized(
        &self,
        method: &Method,
        slug: &str,
        payload: &Payload,
        token: Option<&str>,
        original: ApiError,
    ) -> ApiResult<(u16, Value)> {
        if !self.session.is_soft_expired() && token.map(is_jwt_shaped).unwrap_or(false) {
            if let Some(new_token) = self.refresh.refreshed_token().await {
                if is_jwt_shaped(&new_token) {
                    tracing::debug!(slug, "retrying once with refreshed token");
                    let result = self.dispatch(method, slug, payload, Some(&new_token)).await;
                    if result.is_ok() {
                        self.session.clear_soft_expired();
                    }
                    return result;
                }
            }
        }
        self.session.mark_soft_expired();
        Err(original)
    }

    /// One attempt on the primary path, falling back once to the legacy path
    /// on 404. Does not consume retry budget.
    async fn dispatch(
        &self,
        method: &Method,
        slug: &str,
        payload: &Payload,
        token: Option<&str>,
    ) -> ApiResult<(u16, Value)> {
        let primary = self.endpoint(&self.config.fn_prefix, slug);
        match self.send_once(method, &primary, payload, token).await {
            Err(err) if err.status == Some(404) => {
                let legacy = self.endpoint(&self.config.legacy_prefix, slug);
                tracing::debug!(slug, "primary path returned 404, trying legacy path");
                self.send_once(method, &legacy, payload, token).await
            }
            other => other,
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        payload: &Payload,
        token: Option<&str>,
    ) -> ApiResult<(u16, Value)> {
        let mut request = self.http.request(method.clone(), url);
        match payload {
            Payload::None => {}
            Payload::Query(pairs) => request = request.query(pairs),
            Payload::Json(body) => request = request.json(body),
        }
        if let Some(t) = token {
            request = request.bearer_auth(t);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classifier.classify_transport(&e))?;
        let status = response.status();
        if status.is_success() {
            response
                .json::<Value>()
                .await
                .map(|value| (status.as_u16(), value))
                .map_err(|e| self.classifier.classify_transport(&e))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(self.classifier.classify_status(status.as_u16(), &body))
        }
    }

    fn endpoint(&self, prefix: &str, slug: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            prefix.trim_matches('/'),
            slug
        )
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;

    struct NoopRefresher;
    impl SessionRefresher for NoopRefresher {
        fn current_session(&self) -> BoxFuture<'static, Result<Option<String>, ApiError>> {
            async { Ok(None) }.boxed()
        }
    }

    fn executor(base_url: &str) -> ApiResult<RequestExecutor> {
        let config = ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        };
        RequestExecutor::new(config, Arc::new(SessionStore::in_memory()), Arc::new(NoopRefresher))
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = executor("not a url").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
    }

    #[test]
    fn test_endpoint_paths() {
        let exec = executor("http://localhost:9999/").unwrap();
        assert_eq!(
            exec.endpoint("functions", "usage-summary"),
            "http://localhost:9999/functions/usage-summary"
        );
        assert_eq!(
            exec.endpoint("api/functions", "usage-summary"),
            "http://localhost:9999/api/functions/usage-summary"
        );
    }
}
