//! Probe cadence state machine.
//!
//! # Responsibilities
//! - Track the consecutive-success streak
//! - Compute the delay before the next probe from the last outcome
//!
//! # Design Decisions
//! - Healthy backends are probed less and less often, up to a ceiling
//! - Application-level failures get a fast recheck
//! - Transport-level failures fall back to the baseline; a down endpoint is
//!   not hammered
//!
//! Pure state; no timers, no I/O.

use crate::config::CadenceConfig;

#[derive(Debug, Clone)]
pub struct ProbeCadence {
    cfg: CadenceConfig,
    success_streak: u32,
    next_delay_ms: u64,
}

impl ProbeCadence {
    pub fn new(cfg: CadenceConfig) -> Self {
        let cfg = cfg.normalized();
        Self {
            cfg,
            success_streak: 0,
            next_delay_ms: cfg.base_interval_ms,
        }
    }

    /// Probe succeeded: stretch the interval while the streak holds.
    pub fn on_success(&mut self) {
        self.success_streak = self.success_streak.saturating_add(1);
        let stretched = self
            .cfg
            .base_interval_ms
            .saturating_add(self.cfg.backoff_step_ms * u64::from(self.success_streak - 1));
        self.next_delay_ms = stretched.clamp(self.cfg.base_interval_ms, self.cfg.max_interval_ms);
    }

    /// Application-level failure (an HTTP status came back): fast recheck.
    pub fn on_failure(&mut self) {
        self.success_streak = 0;
        self.next_delay_ms = self
            .cfg
            .failure_retry_ms
            .clamp(1000.min(self.cfg.base_interval_ms), self.cfg.max_interval_ms);
    }

    /// Transport-level failure (timeout, connect error): baseline recheck.
    pub fn on_error(&mut self) {
        self.success_streak = 0;
        self.next_delay_ms = self.cfg.base_interval_ms;
    }

    pub fn reset(&mut self) {
        self.success_streak = 0;
        self.next_delay_ms = self.cfg.base_interval_ms;
    }

    pub fn next_delay_ms(&self) -> u64 {
        self.next_delay_ms
    }

    pub fn success_streak(&self) -> u32 {
        self.success_streak
    }
}
