//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request failure:
//!     → classify.rs (normalize the raw failure, decide retryability)
//!     → retry.rs (resolve effective policy, compute backoff delay)
//!     → executor retry loop (sleep, re-attempt)
//! ```
//!
//! # Design Decisions
//! - Classification is pure; it never performs I/O
//! - Retries only by policy; POST disables them unless the caller opts in
//! - Jittered backoff prevents thundering herd

pub mod classify;
pub mod retry;

pub use classify::Classifier;
pub use retry::{compute_retry_delay_ms, resolve_policy, RetryOverride};
