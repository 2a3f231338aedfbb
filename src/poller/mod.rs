//! LivePoller - Frame Acquisition & Detection Polling
//!
//! ## Responsibilities
//!
//! - Session lifecycle: connect (probe), start/pause detection, stop
//! - Timer-driven fetch-and-detect cycles, strictly sequential
//! - Failure accounting and the consecutive-error threshold
//!
//! A tick never overlaps an in-flight cycle: the cycle runs inline in the
//! loop task and missed ticks are skipped. Stop deactivates the session,
//! so a cycle already in flight can no longer apply its result.

use crate::api_client::{CameraBackend, DiagnosticsReport};
use crate::config::PollerConfig;
use crate::display::DisplayState;
use crate::error::{Error, FailureKind, Result};
use crate::notice_log::{NoticeKind, NoticeLog};
use crate::session::{ConnectionState, Session};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Whether the detection loop keeps running after a cycle
enum CycleOutcome {
    Continue,
    Stop,
}

/// LivePoller instance
pub struct LivePoller {
    backend: Arc<dyn CameraBackend>,
    display: Arc<DisplayState>,
    notices: Arc<NoticeLog>,
    config: PollerConfig,
    session: RwLock<Option<Arc<Session>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LivePoller {
    /// Create new LivePoller
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        display: Arc<DisplayState>,
        notices: Arc<NoticeLog>,
        config: PollerConfig,
    ) -> Self {
        Self {
            backend,
            display,
            notices,
            config,
            session: RwLock::new(None),
            task: Mutex::new(None),
        }
    }

    /// Shared display state
    pub fn display(&self) -> Arc<DisplayState> {
        self.display.clone()
    }

    /// Shared notice log
    pub fn notices(&self) -> Arc<NoticeLog> {
        self.notices.clone()
    }

    /// Current session state, Disconnected when no session exists
    pub async fn session_state(&self) -> ConnectionState {
        match self.session.read().await.as_ref() {
            Some(session) => session.state().await,
            None => ConnectionState::Disconnected,
        }
    }

    /// Consecutive-error count of the current session
    pub async fn error_count(&self) -> u32 {
        match self.session.read().await.as_ref() {
            Some(session) => session.error_count(),
            None => 0,
        }
    }

    /// Connect to a device: run the pre-flight probe and establish a
    /// session on success.
    ///
    /// Returns the diagnostics report in both outcomes; on probe failure
    /// the session is discarded and the report carries the per-endpoint
    /// troubleshooting entries. A transport-level failure (backend
    /// unreachable, as opposed to the remote camera) is returned as an
    /// error instead.
    pub async fn connect(&self, address: &str) -> Result<DiagnosticsReport> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::Validation("device address is empty".to_string()));
        }

        // Tear down any previous session first
        self.stop_camera().await;

        let session = Arc::new(Session::new(address.to_string()));
        *self.session.write().await = Some(session.clone());

        tracing::info!(address = %address, "Testing camera connection");

        let report = match self.backend.test_connection(address).await {
            Ok(report) => report,
            Err(e) => {
                session.deactivate();
                session.set_state(ConnectionState::Disconnected).await;
                *self.session.write().await = None;
                tracing::error!(address = %address, error = %e, "Connectivity test failed");
                return Err(e);
            }
        };

        if report.is_success() {
            session.reset_errors();
            session
                .set_state(ConnectionState::Connected { polling: false })
                .await;
            tracing::info!(address = %address, "Camera connected, ready to start detection");
        } else {
            let details = report.troubleshooting().join("; ");
            self.notices
                .push(
                    NoticeKind::ProbeFailed,
                    format!("Unable to connect to IP Webcam: {}", details),
                )
                .await;
            session.deactivate();
            session.set_state(ConnectionState::Disconnected).await;
            *self.session.write().await = None;
            tracing::warn!(address = %address, details = %details, "Camera probe failed");
        }

        Ok(report)
    }

    /// Arm the periodic detection timer for the connected session
    pub async fn start_detection(&self) -> Result<()> {
        let session = match self.session.read().await.as_ref() {
            Some(session) => session.clone(),
            None => {
                return Err(Error::Validation("camera not started".to_string()));
            }
        };

        match session.state().await {
            ConnectionState::Connected { polling: false } => {}
            ConnectionState::Connected { polling: true } => {
                tracing::warn!("Detection already running");
                return Ok(());
            }
            state => {
                return Err(Error::Validation(format!(
                    "cannot start detection in state {:?}",
                    state
                )));
            }
        }

        session.reset_errors();
        session
            .set_state(ConnectionState::Connected { polling: true })
            .await;

        tracing::info!(address = %session.address(), "Starting detection loop");

        let backend = self.backend.clone();
        let display = self.display.clone();
        let notices = self.notices.clone();
        let threshold = self.config.error_threshold;
        let period = self.config.period;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                if !session.is_active() || !session.state().await.is_polling() {
                    break;
                }

                match Self::run_cycle(&backend, &session, &display, &notices, threshold).await
                {
                    CycleOutcome::Continue => {}
                    CycleOutcome::Stop => break,
                }
            }

            tracing::info!("Detection loop stopped");
        });

        *self.task.lock().await = Some(handle);
        Ok(())
    }

    /// Disarm the detection timer; the session stays connected.
    /// Clears displayed labels, frame rate, and error count. Idempotent.
    pub async fn pause_detection(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
            // Wait for the loop task to fully terminate; a cycle still
            // in flight on another worker must not apply its result
            // after the clear below.
            let _ = handle.await;
        }

        if let Some(session) = self.session.read().await.as_ref() {
            if session.state().await.is_polling() {
                session
                    .set_state(ConnectionState::Connected { polling: false })
                    .await;
            }
            session.reset_errors();
        }

        self.display.clear().await;
        tracing::info!("Detection paused");
    }

    /// Stop the camera: deactivate the session, disarm the timer, and
    /// reset all transient display state. Idempotent; once the session is
    /// deactivated no in-flight cycle result can be applied.
    pub async fn stop_camera(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
            // Same termination barrier as pause: nothing of the old
            // loop may run once the session slot and display are reset.
            let _ = handle.await;
        }

        if let Some(session) = self.session.write().await.take() {
            session.deactivate();
            session.set_state(ConnectionState::Disconnected).await;
            tracing::info!(address = %session.address(), "Camera stopped");
        }

        self.display.clear().await;
    }

    /// One fetch-and-detect cycle
    async fn run_cycle(
        backend: &Arc<dyn CameraBackend>,
        session: &Arc<Session>,
        display: &Arc<DisplayState>,
        notices: &Arc<NoticeLog>,
        threshold: u32,
    ) -> CycleOutcome {
        let outcome = async {
            let frame = backend.fetch_frame(session.address()).await?;
            backend.detect(frame).await
        }
        .await;

        // The session may have been stopped while the requests were in
        // flight; a settled result must not mutate display state then.
        if !session.is_active() {
            return CycleOutcome::Stop;
        }

        match outcome {
            Ok(resp) => {
                if !session.state().await.is_polling() {
                    return CycleOutcome::Stop;
                }

                session.record_success();

                if let Err(e) = display.apply_cycle(resp.labels, &resp.image).await {
                    // A malformed annotated frame is logged but does not
                    // count toward the connection-failure threshold.
                    tracing::warn!(error = %e, "Failed to render annotated frame");
                }

                CycleOutcome::Continue
            }
            Err(e) => {
                match e.failure_kind() {
                    FailureKind::Timeout => {
                        tracing::warn!(error = %e, "Cycle timeout, occasionally expected");
                    }
                    FailureKind::Auth => {
                        tracing::error!(error = %e, "Authentication rejected, ending session");
                        notices
                            .push(
                                NoticeKind::SessionExpired,
                                "Session expired. Please login again.",
                            )
                            .await;
                        session.deactivate();
                        session.set_state(ConnectionState::Disconnected).await;
                        display.clear().await;
                        return CycleOutcome::Stop;
                    }
                    FailureKind::UpstreamLost => {
                        tracing::error!(error = %e, "Lost connection to IP Webcam");
                        display.mark_connection_lost().await;
                    }
                    FailureKind::Other => {
                        tracing::error!(error = %e, "Cycle failed");
                    }
                }

                let errors = session.record_failure();
                if errors >= threshold {
                    tracing::error!(
                        consecutive_errors = errors,
                        "Error threshold reached, giving up"
                    );
                    session.set_state(ConnectionState::Lost).await;
                    display.clear().await;
                    notices
                        .push(
                            NoticeKind::ConnectionLost,
                            "Lost connection to IP Webcam. Please check your connection and try again.",
                        )
                        .await;
                    return CycleOutcome::Stop;
                }

                CycleOutcome::Continue
            }
        }
    }
}
