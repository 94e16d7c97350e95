use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::status::Error;

/// Coarse availability state derived from tracked bus outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverState {
    /// `begin()` has not completed.
    Uninitialized,
    /// Last tracked transaction succeeded.
    Ready,
    /// At least one consecutive failure, below the offline threshold.
    Degraded,
    /// Consecutive failures reached the configured threshold.
    Offline,
}

/// Counters and timestamps maintained by the health tracker.
///
/// Lifetime counters saturate instead of wrapping. Timestamps are the
/// caller's millisecond counter as last seen by `tick()`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HealthStats {
    pub consecutive_failures: u8,
    pub total_success: u32,
    pub total_failures: u32,
    pub last_ok_ms: u32,
    pub last_error_ms: u32,
    pub last_error: Option<Error>,
}

/// Converts tracked-transaction outcomes into availability state.
///
/// Only the tracked transport path feeds this; precondition errors,
/// validation errors, and raw (diagnostic) access never reach it.
#[derive(Debug)]
pub(crate) struct HealthTracker {
    state: DriverState,
    stats: HealthStats,
    offline_threshold: u8,
}

impl HealthTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: DriverState::Uninitialized,
            stats: HealthStats::default(),
            offline_threshold: 1,
        }
    }

    /// Reset to the uninitialized state and install the offline threshold
    /// for the next session. Called from `begin()` and `end()`.
    pub(crate) fn reset(&mut self, offline_threshold: u8) {
        self.state = DriverState::Uninitialized;
        self.stats = HealthStats::default();
        self.offline_threshold = offline_threshold.max(1);
    }

    /// Force `Ready`; `begin()` calls this once initialization succeeds.
    pub(crate) fn mark_ready(&mut self) {
        self.state = DriverState::Ready;
    }

    pub(crate) fn record_success(&mut self, now_ms: u32, initialized: bool) {
        self.stats.consecutive_failures = 0;
        self.stats.total_success = self.stats.total_success.saturating_add(1);
        self.stats.last_ok_ms = now_ms;

        // During begin() the counters run but the state machine holds;
        // begin() decides the terminal state itself.
        if initialized {
            if let DriverState::Degraded | DriverState::Offline = self.state {
                self.state = DriverState::Ready;
            }
        }
    }

    pub(crate) fn record_failure(&mut self, error: Error, now_ms: u32, initialized: bool) {
        self.stats.last_error = Some(error);
        self.stats.last_error_ms = now_ms;
        self.stats.consecutive_failures = self.stats.consecutive_failures.saturating_add(1);
        self.stats.total_failures = self.stats.total_failures.saturating_add(1);

        if initialized {
            if self.stats.consecutive_failures == 1 && self.state == DriverState::Ready {
                self.state = DriverState::Degraded;
                warn!(error = %error, "bus failure, driver degraded");
            }
            if self.stats.consecutive_failures >= self.offline_threshold
                && self.state != DriverState::Offline
            {
                self.state = DriverState::Offline;
                warn!(
                    consecutive_failures = self.stats.consecutive_failures,
                    "failure threshold reached, driver offline"
                );
            }
        }
    }

    pub(crate) fn state(&self) -> DriverState {
        self.state
    }

    pub(crate) fn stats(&self) -> &HealthStats {
        &self.stats
    }
}
