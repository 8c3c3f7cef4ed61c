//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files, and
//! every struct has sane defaults so an empty config is a working config.

use serde::{Deserialize, Serialize};

/// Root configuration for the usage backend client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL (e.g., "https://usage.example.com").
    pub base_url: String,

    /// Path prefix for the primary function endpoints.
    pub fn_prefix: String,

    /// Path prefix for the legacy function endpoints, tried once on 404.
    pub legacy_prefix: String,

    /// Error classification settings.
    pub classifier: ClassifierConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            fn_prefix: "functions".to_string(),
            legacy_prefix: "api/functions".to_string(),
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Retry settings for a single request.
///
/// Created per call and never mutated afterwards.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Number of retries after the initial attempt.
    pub max_retries: u32,

    /// Base delay for the exponential backoff.
    pub base_delay_ms: u64,

    /// Upper bound on the computed backoff delay (before jitter).
    pub max_delay_ms: u64,

    /// Fraction of the delay added as uniform jitter, clamped to [0, 0.5].
    pub jitter_ratio: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self::for_get()
    }
}

impl RetryOptions {
    /// Default policy for GET requests: retry transient failures.
    pub fn for_get() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 300,
            max_delay_ms: 1500,
            jitter_ratio: 0.2,
        }
    }

    /// Default policy for POST requests: no retries (non-idempotent).
    pub fn for_post() -> Self {
        Self {
            max_retries: 0,
            ..Self::for_get()
        }
    }

    /// Clamp fields into their documented ranges.
    pub fn normalized(mut self) -> Self {
        self.jitter_ratio = self.jitter_ratio.clamp(0.0, 0.5);
        self.max_delay_ms = self.max_delay_ms.max(self.base_delay_ms);
        self
    }
}

/// Probe cadence settings.
///
/// Invariant after normalization: `failure_retry_ms <= base_interval_ms`
/// and `max_interval_ms >= base_interval_ms`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Baseline interval between probes.
    pub base_interval_ms: u64,

    /// Ceiling for the stretched interval while healthy.
    pub max_interval_ms: u64,

    /// How much each consecutive success stretches the interval.
    pub backoff_step_ms: u64,

    /// Fast-recheck delay after an application-level failure.
    pub failure_retry_ms: u64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 120_000,
            max_interval_ms: 300_000,
            backoff_step_ms: 0, // 0 means "derive from base_interval_ms"
            failure_retry_ms: 10_000,
        }
    }
}

impl CadenceConfig {
    /// Clamp fields into their documented ranges and derive the step.
    pub fn normalized(mut self) -> Self {
        self.max_interval_ms = self.max_interval_ms.max(self.base_interval_ms);
        if self.backoff_step_ms == 0 {
            self.backoff_step_ms = 1000_u64.max(self.base_interval_ms / 2);
        }
        self.failure_retry_ms = self
            .failure_retry_ms
            .min(self.base_interval_ms)
            .max(1000.min(self.base_interval_ms));
        self
    }
}

/// Backend status monitor settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Deadline for a single probe attempt.
    pub probe_timeout_ms: u64,

    /// Fixed delay between the probe attempt and its single retry.
    pub retry_delay_ms: u64,

    /// Consecutive transport failures before the status becomes Down.
    pub failure_threshold: u32,

    /// Probe cadence settings.
    pub cadence: CadenceConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 2500,
            retry_delay_ms: 300,
            failure_threshold: 2,
            cadence: CadenceConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Floor the threshold. The cadence stays as configured; the scheduler
    /// normalizes its own working copy, so interval changes can re-derive
    /// fields the caller left at their defaults.
    pub fn normalized(mut self) -> Self {
        self.failure_threshold = self.failure_threshold.max(1);
        self
    }
}

/// Error classification settings.
///
/// The runtime-down signature list is heuristic string matching; coverage is
/// environment-specific, so the list stays configurable rather than
/// hard-coded.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Message substrings that indicate a transport-level failure.
    pub transport_signatures: Vec<String>,

    /// Message substrings that indicate the gateway is reachable but the
    /// execution runtime behind it is not.
    pub runtime_down_signatures: Vec<String>,

    /// Stable message all runtime-down variants are rewritten to.
    pub runtime_down_message: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            transport_signatures: [
                "connection refused",
                "connection reset",
                "timed out",
                "timeout",
                "error sending request",
                "dns error",
                "broken pipe",
                "failed to fetch",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            runtime_down_signatures: [
                "runtime is not ready",
                "function runtime",
                "no healthy upstream",
                "upstream connect error",
                "failed to invoke function",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            runtime_down_message: "Backend function runtime is unreachable".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_defaults() {
        let get = RetryOptions::for_get();
        assert_eq!(get.max_retries, 2);
        assert_eq!(get.base_delay_ms, 300);
        assert_eq!(get.max_delay_ms, 1500);

        let post = RetryOptions::for_post();
        assert_eq!(post.max_retries, 0);
    }

    #[test]
    fn test_retry_normalization_clamps() {
        let opts = RetryOptions {
            max_retries: 3,
            base_delay_ms: 2000,
            max_delay_ms: 500,
            jitter_ratio: 0.9,
        }
        .normalized();
        assert_eq!(opts.max_delay_ms, 2000);
        assert!((opts.jitter_ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cadence_defaults_derive_step() {
        let cfg = CadenceConfig::default().normalized();
        assert_eq!(cfg.backoff_step_ms, 60_000);
        assert_eq!(cfg.failure_retry_ms, 10_000);
        assert!(cfg.max_interval_ms >= cfg.base_interval_ms);
    }

    #[test]
    fn test_cadence_failure_retry_clamped_to_base() {
        let cfg = CadenceConfig {
            base_interval_ms: 5_000,
            max_interval_ms: 5_000,
            backoff_step_ms: 0,
            failure_retry_ms: 60_000,
        }
        .normalized();
        assert_eq!(cfg.failure_retry_ms, 5_000);
        assert_eq!(cfg.backoff_step_ms, 2_500);
    }

    #[test]
    fn test_monitor_threshold_floor() {
        let cfg = MonitorConfig {
            failure_threshold: 0,
            ..MonitorConfig::default()
        }
        .normalized();
        assert_eq!(cfg.failure_threshold, 1);
    }

    #[test]
    fn test_empty_config_deserializes() {
        let cfg: ClientConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.fn_prefix, "functions");
        assert_eq!(cfg.legacy_prefix, "api/functions");
    }
}
