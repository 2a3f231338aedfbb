//! Camera Session
//!
//! One user-initiated connection to an IP Webcam device. Constructed on
//! connect, deactivated on stop; the poller passes it explicitly to every
//! cycle instead of reading ambient state.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::RwLock;

/// Connectivity state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session established
    Disconnected,
    /// Connectivity probe in flight
    Testing,
    /// Session established; polling indicates whether the timer is armed
    Connected { polling: bool },
    /// Terminal after sustained failure, until the user restarts
    Lost,
}

impl ConnectionState {
    /// Whether the detection timer is currently armed
    pub fn is_polling(&self) -> bool {
        matches!(self, ConnectionState::Connected { polling: true })
    }
}

/// One camera connection attempt
pub struct Session {
    /// Target device address
    address: String,
    state: RwLock<ConnectionState>,
    /// Consecutive-error count; the single authoritative counter
    consecutive_errors: AtomicU32,
    /// Cleared on stop so in-flight cycle results are discarded
    active: AtomicBool,
}

impl Session {
    /// Create a session for a device address, in Testing state
    pub fn new(address: String) -> Self {
        Self {
            address,
            state: RwLock::new(ConnectionState::Testing),
            consecutive_errors: AtomicU32::new(0),
            active: AtomicBool::new(true),
        }
    }

    /// Target device address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current connectivity state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Transition to a new state
    pub async fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.write().await;
        tracing::debug!(from = ?*current, to = ?state, "Session state transition");
        *current = state;
    }

    /// Record one failed cycle and return the updated consecutive count.
    ///
    /// Increment and read happen in a single atomic step so the threshold
    /// check in the same failure handler never sees a stale value.
    pub fn record_failure(&self) -> u32 {
        self.consecutive_errors.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record one successful cycle, resetting the consecutive count
    pub fn record_success(&self) {
        self.consecutive_errors.store(0, Ordering::SeqCst);
    }

    /// Current consecutive-error count
    pub fn error_count(&self) -> u32 {
        self.consecutive_errors.load(Ordering::SeqCst)
    }

    /// Reset the error count (on detection start/pause)
    pub fn reset_errors(&self) {
        self.consecutive_errors.store(0, Ordering::SeqCst);
    }

    /// Whether results may still be applied for this session
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Deactivate the session. Idempotent; any in-flight cycle checks this
    /// before mutating display state, so completion after stop is a no-op.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_session_starts_testing() {
        let session = Session::new("192.168.1.100".to_string());
        assert_eq!(session.state().await, ConnectionState::Testing);
        assert_eq!(session.error_count(), 0);
        assert!(session.is_active());
    }

    #[test]
    fn failure_count_is_consecutive() {
        let session = Session::new("192.168.1.100".to_string());
        assert_eq!(session.record_failure(), 1);
        assert_eq!(session.record_failure(), 2);
        session.record_success();
        assert_eq!(session.error_count(), 0);
        assert_eq!(session.record_failure(), 1);
    }

    #[test]
    fn deactivate_is_idempotent() {
        let session = Session::new("192.168.1.100".to_string());
        session.deactivate();
        session.deactivate();
        assert!(!session.is_active());
    }

    #[test]
    fn polling_flag_reflects_state() {
        assert!(ConnectionState::Connected { polling: true }.is_polling());
        assert!(!ConnectionState::Connected { polling: false }.is_polling());
        assert!(!ConnectionState::Lost.is_polling());
        assert!(!ConnectionState::Testing.is_polling());
    }
}
