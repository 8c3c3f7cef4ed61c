//! Resilient client library for the usage-analytics backend.
//!
//! Everything network-facing funnels through [`client::RequestExecutor`];
//! the [`monitor`] keeps an adaptive connection-status state machine on top
//! of it.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod monitor;
pub mod resilience;

pub use auth::{SessionEvent, SessionRefresher, SessionStore, TokenProvider};
pub use client::{RequestKind, UsageClient};
pub use config::{CadenceConfig, ClientConfig, MonitorConfig, RetryOptions};
pub use error::{ApiError, ApiResult, ErrorKind};
pub use monitor::{BackendStatusMonitor, ConnectionStatus, MonitorHandle, StatusSnapshot};
pub use resilience::RetryOverride;
