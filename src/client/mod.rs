//! Client subsystem.
//!
//! # Data Flow
//! ```text
//! Caller (hook, monitor, CLI):
//!     → api.rs (typed endpoint wrappers)
//!     → executor.rs (path resolution, retry loop, 401 recovery)
//!     → resilience (classification, backoff)
//!     → auth (token resolution, single-flight refresh, soft expiry)
//! ```
//!
//! # Design Decisions
//! - All traffic funnels through one executor; no endpoint talks to the
//!   transport directly
//! - The legacy-path fallback is a path concern, not a retry concern; it
//!   never consumes retry budget
//! - Probe requests never touch session state

pub mod api;
pub mod executor;

pub use api::{ProbeResponse, UsageClient};
pub use executor::{Payload, RequestExecutor, RequestKind};
