//! Connection-health monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! Monitor task (status.rs):
//!     cancellable sleep OR command (refresh/suspend/resume)
//!     → probe cycle (one attempt + at most one retry, each with a deadline)
//!     → status state machine {Unknown, Active, Error, Down}
//!     → cadence.rs computes the next wake time
//!     → snapshot published on a watch channel
//! ```
//!
//! # Design Decisions
//! - Probe cycles never overlap; the loop is strictly sequential
//! - 4xx responses are deterministic, they never count toward Down
//! - Suspend disarms the timer; resume probes immediately and re-arms

pub mod cadence;
pub mod status;

pub use cadence::ProbeCadence;
pub use status::{BackendStatusMonitor, ConnectionStatus, MonitorHandle, ProbeOutcome, StatusSnapshot};
