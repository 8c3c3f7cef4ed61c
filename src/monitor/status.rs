//! Backend status monitor.
//!
//! # Responsibilities
//! - Periodically probe the backend through the client
//! - Derive the connection status from probe outcomes
//! - Publish a snapshot on a watch channel for reactive consumers
//!
//! # State Transitions
//! ```text
//! probe ok            → Active (failure counter reset)
//! 4xx (401/403/...)   → Error  (deterministic; counter reset)
//! transport/5xx       → Error, then Down once consecutive failures
//!                       reach the threshold
//! ```
//!
//! # Design Decisions
//! - One attempt plus at most one retry per cycle, each with its own deadline
//! - A suspended monitor keeps its last snapshot; resume probes immediately
//! - Dropping the handle stops the task

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::auth::TokenProvider;
use crate::client::UsageClient;
use crate::config::{CadenceConfig, MonitorConfig};
use crate::error::{ApiError, ErrorKind};
use crate::monitor::cadence::ProbeCadence;

/// Connection status derived from probe history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No probe has completed yet.
    Unknown,
    /// Last probe succeeded.
    Active,
    /// Last probe failed, below the down threshold or deterministically.
    Error,
    /// Consecutive transport failures reached the threshold.
    Down,
}

/// Result of one probe cycle.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub status: Option<u16>,
    pub error: Option<ApiError>,
}

/// Snapshot published to consumers after every cycle.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub status: ConnectionStatus,
    pub checking: bool,
    pub http_status: Option<u16>,
    pub last_checked_at: Option<SystemTime>,
    pub last_ok_at: Option<SystemTime>,
    pub error: Option<String>,
}

impl StatusSnapshot {
    fn initial() -> Self {
        Self {
            status: ConnectionStatus::Unknown,
            checking: false,
            http_status: None,
            last_checked_at: None,
            last_ok_at: None,
            error: None,
        }
    }
}

#[derive(Debug)]
enum Command {
    Refresh,
    Suspend,
    Resume,
    SetBaseInterval(u64),
}

/// Handle to a running monitor. Dropping it stops the task.
pub struct MonitorHandle {
    state: watch::Receiver<StatusSnapshot>,
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Current snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.state.clone()
    }

    /// Request an immediate out-of-band probe.
    pub async fn refresh(&self) {
        let _ = self.commands.send(Command::Refresh).await;
    }

    /// Disarm the timer; the last snapshot stays visible.
    pub async fn suspend(&self) {
        let _ = self.commands.send(Command::Suspend).await;
    }

    /// Re-arm the timer and probe immediately.
    pub async fn resume(&self) {
        let _ = self.commands.send(Command::Resume).await;
    }

    /// Change the baseline probe interval; resets cadence state.
    pub async fn set_base_interval(&self, base_interval_ms: u64) {
        let _ = self
            .commands
            .send(Command::SetBaseInterval(base_interval_ms))
            .await;
    }

    /// Wait for the monitor task to finish (it finishes when every command
    /// sender is gone).
    pub async fn join(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        let _ = task.await;
    }
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// Spawns and drives the probe loop.
pub struct BackendStatusMonitor;

impl BackendStatusMonitor {
    pub fn spawn(client: Arc<UsageClient>, token: TokenProvider, config: MonitorConfig) -> MonitorHandle {
        let config = config.normalized();
        let (state_tx, state_rx) = watch::channel(StatusSnapshot::initial());
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let task = tokio::spawn(run(client, token, config, state_tx, cmd_rx));
        MonitorHandle {
            state: state_rx,
            commands: cmd_tx,
            task,
        }
    }
}

async fn run(
    client: Arc<UsageClient>,
    token: TokenProvider,
    config: MonitorConfig,
    state: watch::Sender<StatusSnapshot>,
    mut commands: mpsc::Receiver<Command>,
) {
    let mut config = config;
    let mut cadence = ProbeCadence::new(config.cadence);
    let mut snapshot = StatusSnapshot::initial();
    let mut failures: u32 = 0;
    let mut suspended = false;
    let mut probe_due = true;

    loop {
        if probe_due && !suspended {
            run_cycle(
                &client,
                &token,
                &config,
                &state,
                &mut snapshot,
                &mut cadence,
                &mut failures,
            )
            .await;
        }
        probe_due = false;

        let delay = Duration::from_millis(cadence.next_delay_ms());
        tokio::select! {
            _ = tokio::time::sleep(delay), if !suspended => {
                probe_due = true;
            }
            command = commands.recv() => match command {
                None => break,
                Some(Command::Refresh) => probe_due = true,
                Some(Command::Suspend) => suspended = true,
                Some(Command::Resume) => {
                    if suspended {
                        suspended = false;
                        probe_due = true;
                    }
                }
                Some(Command::SetBaseInterval(base_interval_ms)) => {
                    cadence = rebase_cadence(&mut config.cadence, base_interval_ms);
                }
            },
        }
    }
}

async fn run_cycle(
    client: &UsageClient,
    token: &TokenProvider,
    config: &MonitorConfig,
    state: &watch::Sender<StatusSnapshot>,
    snapshot: &mut StatusSnapshot,
    cadence: &mut ProbeCadence,
    failures: &mut u32,
) {
    snapshot.checking = true;
    state.send_replace(snapshot.clone());

    let outcome = probe_with_retry(client, token, config).await;
    let now = SystemTime::now();

    let (status, next_failures) = apply_outcome(&outcome, *failures, config.failure_threshold);
    if status != snapshot.status {
        tracing::info!(from = ?snapshot.status, to = ?status, "connection status changed");
    }
    *failures = next_failures;

    snapshot.checking = false;
    snapshot.status = status;
    snapshot.http_status = outcome.status;
    snapshot.last_checked_at = Some(now);
    if outcome.ok {
        snapshot.last_ok_at = Some(now);
        snapshot.error = None;
        cadence.on_success();
    } else {
        snapshot.error = outcome.error.as_ref().map(|e| e.to_string());
        if outcome.status.is_some() {
            cadence.on_failure();
        } else {
            cadence.on_error();
        }
    }
    state.send_replace(snapshot.clone());
}

/// Replace the baseline interval in place and reset the cadence state.
/// Every other configured cadence field survives the change.
fn rebase_cadence(cfg: &mut CadenceConfig, base_interval_ms: u64) -> ProbeCadence {
    cfg.base_interval_ms = base_interval_ms;
    ProbeCadence::new(*cfg)
}

/// One attempt plus at most one retry, each bounded by the probe deadline.
async fn probe_with_retry(
    client: &UsageClient,
    token: &TokenProvider,
    config: &MonitorConfig,
) -> ProbeOutcome {
    let first = probe_once(client, token, config.probe_timeout_ms).await;
    if first.ok || !retry_eligible(&first) {
        return first;
    }
    tracing::debug!(error = ?first.error.as_ref().map(|e| e.to_string()), "probe failed, retrying once");
    tokio::time::sleep(Duration::from_millis(config.retry_delay_ms)).await;
    probe_once(client, token, config.probe_timeout_ms).await
}

async fn probe_once(client: &UsageClient, token: &TokenProvider, timeout_ms: u64) -> ProbeOutcome {
    match timeout(Duration::from_millis(timeout_ms), client.probe_backend(token)).await {
        Ok(Ok(response)) => ProbeOutcome {
            ok: true,
            status: Some(response.status),
            error: None,
        },
        Ok(Err(err)) => ProbeOutcome {
            ok: false,
            status: err.status,
            error: Some(err),
        },
        Err(_) => ProbeOutcome {
            ok: false,
            status: None,
            error: Some(
                ApiError::new(
                    ErrorKind::Timeout,
                    format!("probe timed out after {timeout_ms}ms"),
                )
                .retryable(true),
            ),
        },
    }
}

/// Retry once on an explicitly retryable failure, any 5xx, or a timeout.
fn retry_eligible(outcome: &ProbeOutcome) -> bool {
    match &outcome.error {
        Some(err) => {
            err.retryable || err.is_timeout() || matches!(outcome.status, Some(s) if s >= 500)
        }
        None => false,
    }
}

/// Pure status transition: 4xx resets the failure counter, transport and 5xx
/// count toward the down threshold.
fn apply_outcome(outcome: &ProbeOutcome, failures: u32, threshold: u32) -> (ConnectionStatus, u32) {
    if outcome.ok {
        return (ConnectionStatus::Active, 0);
    }
    if matches!(outcome.status, Some(s) if (400..500).contains(&s)) {
        return (ConnectionStatus::Error, 0);
    }
    let failures = failures.saturating_add(1);
    if failures >= threshold {
        (ConnectionStatus::Down, failures)
    } else {
        (ConnectionStatus::Error, failures)
    }
}
