//! Engine reachability state shared across the daemon.
//!
//! Two connection flags (command port, feedback port) are folded into one
//! overall status. Reads are lock-free; the only lock guards the heartbeat
//! log instant.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Instant;
use tracing::info;

/// Interval between steady-state heartbeat log lines.
const HEARTBEAT_LOG_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Starting,
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn as_u8(self) -> u8 {
        match self {
            HealthStatus::Starting => 0,
            HealthStatus::Healthy => 1,
            HealthStatus::Degraded => 2,
            HealthStatus::Unhealthy => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => HealthStatus::Healthy,
            2 => HealthStatus::Degraded,
            3 => HealthStatus::Unhealthy,
            _ => HealthStatus::Starting,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Starting => "starting",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Point-in-time view served on the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub message: String,
    pub command_connected: bool,
    pub feedback_connected: bool,
}

/// Shared health record. One per process.
pub struct HealthState {
    status: AtomicU8,
    command_connected: AtomicBool,
    feedback_connected: AtomicBool,
    last_log: Mutex<Instant>,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(HealthStatus::Starting.as_u8()),
            command_connected: AtomicBool::new(false),
            feedback_connected: AtomicBool::new(false),
            last_log: Mutex::new(Instant::now()),
        }
    }

    /// Record whether the engine command port is reachable.
    pub fn mark_command(&self, connected: bool) {
        self.command_connected.store(connected, Ordering::SeqCst);
        self.refresh_status();
    }

    /// Record whether the engine feedback stream is connected.
    pub fn mark_feedback(&self, connected: bool) {
        self.feedback_connected.store(connected, Ordering::SeqCst);
        self.refresh_status();
    }

    pub fn status(&self) -> HealthStatus {
        HealthStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn command_connected(&self) -> bool {
        self.command_connected.load(Ordering::SeqCst)
    }

    pub fn feedback_connected(&self) -> bool {
        self.feedback_connected.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let status = self.status();
        HealthSnapshot {
            status,
            message: status_message(status).to_string(),
            command_connected: self.command_connected(),
            feedback_connected: self.feedback_connected(),
        }
    }

    /// Derive overall status from the connection flags. `Starting` exists
    /// only until the first update; afterwards the status is a pure function
    /// of the two booleans.
    fn refresh_status(&self) {
        let command = self.command_connected();
        let feedback = self.feedback_connected();
        let new_status = if command && feedback {
            HealthStatus::Healthy
        } else if command {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        let old = HealthStatus::from_u8(
            self.status
                .swap(new_status.as_u8(), Ordering::SeqCst),
        );

        if old != new_status {
            info!(
                "Health status changed: {} -> {}",
                old.as_str(),
                new_status.as_str()
            );
            *self.last_log.lock() = Instant::now();
        } else {
            let mut last_log = self.last_log.lock();
            if last_log.elapsed().as_secs() >= HEARTBEAT_LOG_INTERVAL_SECS {
                info!(
                    "Health status: {} (command: {}, feedback: {})",
                    new_status.as_str(),
                    command,
                    feedback
                );
                *last_log = Instant::now();
            }
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

fn status_message(status: HealthStatus) -> &'static str {
    match status {
        HealthStatus::Starting => "Service is starting up, waiting for mod-host connections",
        HealthStatus::Healthy => "Service is healthy, all connections established",
        HealthStatus::Degraded => {
            "Service is degraded, command connection available but feedback connection lost"
        }
        HealthStatus::Unhealthy => "Service is unhealthy, cannot connect to mod-host",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_is_starting() {
        let state = HealthState::new();
        assert_eq!(state.status(), HealthStatus::Starting);
        assert!(!state.command_connected());
        assert!(!state.feedback_connected());
    }

    #[test]
    fn test_status_derivation_table() {
        let state = HealthState::new();

        state.mark_command(false);
        assert_eq!(state.status(), HealthStatus::Unhealthy);

        state.mark_command(true);
        assert_eq!(state.status(), HealthStatus::Degraded);

        state.mark_feedback(true);
        assert_eq!(state.status(), HealthStatus::Healthy);

        state.mark_feedback(false);
        assert_eq!(state.status(), HealthStatus::Degraded);

        state.mark_command(false);
        assert_eq!(state.status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_starting_never_returns_after_first_update() {
        let state = HealthState::new();
        state.mark_command(true);
        state.mark_feedback(true);
        assert_eq!(state.status(), HealthStatus::Healthy);

        state.mark_command(false);
        state.mark_feedback(false);
        assert_eq!(state.status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_recovery_sequence() {
        // healthy -> degraded -> unhealthy -> degraded -> healthy
        let state = HealthState::new();
        state.mark_command(true);
        state.mark_feedback(true);
        assert_eq!(state.status(), HealthStatus::Healthy);

        state.mark_feedback(false);
        assert_eq!(state.status(), HealthStatus::Degraded);

        state.mark_command(false);
        assert_eq!(state.status(), HealthStatus::Unhealthy);

        state.mark_command(true);
        assert_eq!(state.status(), HealthStatus::Degraded);

        state.mark_feedback(true);
        assert_eq!(state.status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_snapshot_fields() {
        let state = HealthState::new();
        let snap = state.snapshot();
        assert_eq!(snap.status, HealthStatus::Starting);
        assert!(snap.message.contains("starting up"));

        state.mark_command(true);
        state.mark_feedback(false);
        let snap = state.snapshot();
        assert_eq!(snap.status, HealthStatus::Degraded);
        assert!(snap.command_connected);
        assert!(!snap.feedback_connected);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Starting).unwrap(),
            "\"starting\""
        );
    }
}
