//! Retry policy resolution and backoff.
//!
//! # Responsibilities
//! - Resolve the effective retry options from caller overrides and
//!   method-specific defaults
//! - Compute the jittered exponential backoff delay between attempts
//!
//! # Design Decisions
//! - POST defaults to zero retries (non-idempotent); callers opt in
//! - An explicit `Disabled` override forces zero retries regardless of method
//! - Jitter is additive and bounded by `delay * jitter_ratio`

use rand::Rng;
use reqwest::Method;

use crate::config::RetryOptions;

/// Caller-supplied retry override for one request.
#[derive(Debug, Clone, Copy)]
pub enum RetryOverride {
    /// Force zero retries, whatever the method default says.
    Disabled,
    /// Replace the method default entirely.
    Options(RetryOptions),
}

/// Resolve the effective retry options for a request.
pub fn resolve_policy(method: &Method, override_: Option<RetryOverride>) -> RetryOptions {
    let resolved = match override_ {
        Some(RetryOverride::Disabled) => RetryOptions {
            max_retries: 0,
            ..default_for(method)
        },
        Some(RetryOverride::Options(opts)) => opts,
        None => default_for(method),
    };
    resolved.normalized()
}

fn default_for(method: &Method) -> RetryOptions {
    if *method == Method::GET {
        RetryOptions::for_get()
    } else {
        RetryOptions::for_post()
    }
}

/// Deterministic backoff component: `min(max_delay, base * 2^(attempt-1))`.
///
/// `attempt` counts completed attempts, so the first retry waits roughly the
/// base delay. Attempt 0 means nothing has failed yet and waits nothing.
pub fn backoff_ms(opts: &RetryOptions, attempt: u32) -> u64 {
    if attempt == 0 {
        return 0;
    }
    let exponential = 2u64.saturating_pow(attempt - 1);
    opts.base_delay_ms
        .saturating_mul(exponential)
        .min(opts.max_delay_ms)
}

/// Backoff plus uniform jitter in `[0, delay * jitter_ratio]`.
pub fn compute_retry_delay_ms(opts: &RetryOptions, attempt: u32) -> u64 {
    let delay = backoff_ms(opts, attempt);
    let jitter_cap = (delay as f64 * opts.jitter_ratio) as u64;
    let jitter = if jitter_cap > 0 {
        rand::thread_rng().gen_range(0..=jitter_cap)
    } else {
        0
    };
    delay + jitter
}
