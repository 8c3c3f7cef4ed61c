//! Typed endpoint wrappers.
//!
//! # Responsibilities
//! - Expose the usage and leaderboard endpoints as typed calls
//! - Expose the health probe used by the status monitor
//!
//! All calls route through [`RequestExecutor`]; nothing here touches the
//! transport directly.

use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::{SessionRefresher, SessionStore, TokenProvider};
use crate::client::executor::{Payload, RequestExecutor, RequestKind};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult, ErrorKind};
use crate::resilience::RetryOverride;

/// Slug of the lightweight health-probe function.
pub const PROBE_SLUG: &str = "health";

/// Successful probe result: the actual HTTP status plus the body.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: Value,
}

/// Token totals for a usage window.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageTotals {
    #[serde(default)]
    pub total_tokens: String,
    #[serde(default)]
    pub total_cost: Option<f64>,
    #[serde(default)]
    pub request_count: Option<u64>,
}

/// Aggregated usage for a period.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageSummary {
    pub totals: UsageTotals,
}

/// One day of usage.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyUsage {
    pub date: String,
    #[serde(default)]
    pub total_tokens: String,
    #[serde(default)]
    pub total_cost: Option<f64>,
}

/// One leaderboard row.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardEntry {
    pub user: String,
    #[serde(default)]
    pub total_tokens: String,
    #[serde(default)]
    pub rank: Option<u64>,
}

/// One page of the leaderboard.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardPage {
    #[serde(default)]
    pub entries: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// High-level client over the usage backend.
pub struct UsageClient {
    executor: RequestExecutor,
}

impl UsageClient {
    pub fn new(config: ClientConfig, refresher: Arc<dyn SessionRefresher>) -> ApiResult<Self> {
        Self::with_session(config, Arc::new(SessionStore::in_memory()), refresher)
    }

    pub fn with_session(
        config: ClientConfig,
        session: Arc<SessionStore>,
        refresher: Arc<dyn SessionRefresher>,
    ) -> ApiResult<Self> {
        Ok(Self {
            executor: RequestExecutor::new(config, session, refresher)?,
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.executor.session()
    }

    /// Direct access to the executor for ad-hoc calls.
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Lightweight health probe. Never retried here and never touches
    /// session state; the status monitor owns timeout and retry-once.
    pub async fn probe_backend(&self, token: &TokenProvider) -> ApiResult<ProbeResponse> {
        let (status, body) = self
            .executor
            .execute_with_status(
                Method::GET,
                PROBE_SLUG,
                Payload::None,
                token,
                Some(RetryOverride::Disabled),
                RequestKind::Probe,
            )
            .await?;
        Ok(ProbeResponse { status, body })
    }

    /// Usage totals, optionally bounded to `[from, to]` dates (ISO 8601).
    pub async fn get_usage_summary(
        &self,
        token: &TokenProvider,
        range: Option<(&str, &str)>,
    ) -> ApiResult<UsageSummary> {
        let mut params = Vec::new();
        if let Some((from, to)) = range {
            params.push(("from".to_string(), from.to_string()));
            params.push(("to".to_string(), to.to_string()));
        }
        let value = self
            .executor
            .execute(
                Method::GET,
                "usage-summary",
                Payload::Query(params),
                token,
                None,
                RequestKind::Business,
            )
            .await?;
        decode("usage-summary", value)
    }

    /// Per-day usage for the trailing `days` window.
    pub async fn get_usage_daily(
        &self,
        token: &TokenProvider,
        days: u32,
    ) -> ApiResult<Vec<DailyUsage>> {
        let value = self
            .executor
            .execute(
                Method::GET,
                "usage-daily",
                Payload::Query(vec![("days".to_string(), days.to_string())]),
                token,
                None,
                RequestKind::Business,
            )
            .await?;
        decode("usage-daily", value)
    }

    /// Leaderboard page. Ranking math happens server-side.
    pub async fn get_leaderboard(
        &self,
        token: &TokenProvider,
        limit: u32,
        cursor: Option<&str>,
    ) -> ApiResult<LeaderboardPage> {
        let mut params = vec![("limit".to_string(), limit.to_string())];
        if let Some(cursor) = cursor {
            params.push(("cursor".to_string(), cursor.to_string()));
        }
        let value = self
            .executor
            .execute(
                Method::GET,
                "leaderboard",
                Payload::Query(params),
                token,
                None,
                RequestKind::Business,
            )
            .await?;
        decode("leaderboard", value)
    }
}

impl std::fmt::Debug for UsageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageClient")
            .field("executor", &self.executor)
            .finish()
    }
}

fn decode<T: serde::de::DeserializeOwned>(slug: &str, value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| {
        ApiError::new(
            ErrorKind::Decode,
            format!("unexpected response shape from {slug}: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_decodes_stringly_totals() {
        let value: Value = serde_json::from_str(r#"{"totals":{"total_tokens":"0"}}"#).unwrap();
        let summary: UsageSummary = decode("usage-summary", value).unwrap();
        assert_eq!(summary.totals.total_tokens, "0");
        assert!(summary.totals.total_cost.is_none());
    }

    #[test]
    fn test_decode_error_is_not_retryable() {
        let err = decode::<UsageSummary>("usage-summary", Value::Null).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
        assert!(!err.retryable);
    }
}
