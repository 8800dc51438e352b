//! Core session state and commands.

#![allow(missing_docs)]

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use tracing::debug;

use crate::backend::{Forecaster, SimulatedForecaster, SimulatedTagServer, TagServer};
use crate::config::{SessionConfig, SessionTiming, TagId};
use crate::error::SessionError;
use crate::log::{LogHistory, LogLevel};
use crate::metrics::{SessionMetrics, TickStats};
use crate::status::Status;
use crate::window::Window;

use super::types::{Pending, PendingStep, SessionSnapshot};

/// Controller for one forecasting session.
///
/// Owns status, log history, the bounded chart window, and the derived
/// metrics snapshot. All state advances happen on the caller's thread:
/// commands mutate immediately, delayed transitions and prediction ticks
/// are applied by [`Session::poll`] against a caller-supplied clock
/// reading. The [`SessionRunner`](crate::scheduler::SessionRunner) drives
/// `poll` from a dedicated thread for wall-clock operation.
pub struct Session {
    pub(super) status: Status,
    pub(super) config: SessionConfig,
    pub(super) timing: SessionTiming,
    pub(super) logs: LogHistory,
    pub(super) window: Window,
    pub(super) metrics: SessionMetrics,
    pub(super) stats: TickStats,
    pub(super) server: Box<dyn TagServer>,
    pub(super) forecaster: Box<dyn Forecaster>,
    pub(super) tick_counter: u64,
    pub(super) current_time: Duration,
    pub(super) pending: Option<Pending>,
    pub(super) next_tick_due: Option<Duration>,
    pub(super) loop_tag: Option<TagId>,
    pub(super) last_error: Option<SessionError>,
    observers: Vec<Sender<SessionSnapshot>>,
    revision: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status)
            .field("config", &self.config)
            .field("window_len", &self.window.len())
            .field("log_len", &self.logs.len())
            .field("tick_counter", &self.tick_counter)
            .field("current_time", &self.current_time)
            .field("pending", &self.pending.is_some())
            .field("next_tick_due", &self.next_tick_due)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl Session {
    /// Create a session over explicit backends.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        timing: SessionTiming,
        server: Box<dyn TagServer>,
        forecaster: Box<dyn Forecaster>,
    ) -> Self {
        Self {
            status: Status::Disconnected,
            config,
            timing,
            logs: LogHistory::new(),
            window: Window::new(),
            metrics: SessionMetrics::new(),
            stats: TickStats::default(),
            server,
            forecaster,
            tick_counter: 0,
            current_time: Duration::ZERO,
            pending: None,
            next_tick_due: None,
            loop_tag: None,
            last_error: None,
            observers: Vec::new(),
            revision: 0,
        }
    }

    /// Create a session backed by the simulated server and forecaster.
    #[must_use]
    pub fn simulated(config: SessionConfig, timing: SessionTiming) -> Self {
        Self::new(
            config,
            timing,
            Box::new(SimulatedTagServer::new()),
            Box::new(SimulatedForecaster::new()),
        )
    }

    /// Request the connect-and-train sequence.
    ///
    /// Permitted from `Disconnected`, `Ready`, and `Error`. Rejection
    /// leaves all state untouched and appends no log entry.
    pub fn connect_and_train(&mut self) -> Result<(), SessionError> {
        if !self.status.permits_connect() {
            debug!(status = %self.status, "connect_and_train rejected");
            return Err(SessionError::rejected("connect_and_train", self.status));
        }
        let config = self.config.clone();
        self.set_status(Status::Connecting);
        self.push_log(
            LogLevel::Info,
            format!(
                "Attempting to connect to OPC UA server at {}...",
                config.endpoint
            ),
        );
        self.pending = Some(Pending {
            due_at: self.current_time + self.timing.connect_delay,
            step: PendingStep::Connect {
                endpoint: config.endpoint,
                username: config.username,
                tag: config.tag,
                model: config.model,
            },
        });
        self.notify_observers();
        Ok(())
    }

    /// Start the prediction loop, or request a stop if it is running.
    ///
    /// Starting is rejected while connect, train, or the stop drain are in
    /// flight. Stopping cancels the tick schedule before returning; no
    /// tick fires after this call.
    pub fn toggle_prediction_loop(&mut self) -> Result<(), SessionError> {
        if self.status == Status::Predicting {
            self.set_status(Status::Stopping);
            self.push_log(LogLevel::Warn, "Stopping prediction loop...");
            self.cancel_ticks();
            self.pending = Some(Pending {
                due_at: self.current_time + self.timing.stop_drain,
                step: PendingStep::StopDrain,
            });
            self.notify_observers();
            return Ok(());
        }
        if !self.status.permits_loop_start() {
            debug!(status = %self.status, "toggle_prediction_loop rejected");
            return Err(SessionError::rejected("toggle_prediction_loop", self.status));
        }
        let interval = self.timing.tick_interval;
        self.set_status(Status::Predicting);
        self.push_log(
            LogLevel::Info,
            format!(
                "Starting prediction loop (1 update every {} seconds)...",
                interval.as_secs()
            ),
        );
        self.loop_tag = Some(self.config.tag);
        self.run_tick();
        self.next_tick_due = Some(self.current_time + interval);
        self.notify_observers();
        Ok(())
    }

    /// Cancel timers and detach observers. Idempotent; safe to call on an
    /// already disposed session.
    pub fn dispose(&mut self) {
        self.pending = None;
        self.cancel_ticks();
        self.observers.clear();
    }

    pub(super) fn cancel_ticks(&mut self) {
        self.next_tick_due = None;
        self.loop_tag = None;
    }

    /// Register an observer. The current snapshot is delivered
    /// immediately, then one snapshot per change. Disconnected receivers
    /// are pruned on the next delivery.
    pub fn subscribe(&mut self) -> Receiver<SessionSnapshot> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.snapshot());
        self.observers.push(tx);
        rx
    }

    /// Current immutable state view.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            logs: self.logs.snapshot(),
            window: self.window.snapshot(),
            metrics: self.metrics.clone(),
            revision: self.revision,
        }
    }

    pub(super) fn notify_observers(&mut self) {
        self.revision = self.revision.saturating_add(1);
        let snapshot = self.snapshot();
        self.observers
            .retain(|observer| observer.send(snapshot.clone()).is_ok());
    }

    pub(super) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub(super) fn push_log(&mut self, level: LogLevel, message: impl Into<smol_str::SmolStr>) {
        self.logs.push(level, message);
    }

    pub(super) fn record_error(&mut self, err: SessionError) {
        self.push_log(LogLevel::Error, err.to_string());
        self.set_status(Status::Error);
        self.last_error = Some(err);
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the configuration. In-flight operations keep the values
    /// captured when their command was issued.
    pub fn set_config(&mut self, config: SessionConfig) {
        self.config = config;
    }

    #[must_use]
    pub fn timing(&self) -> SessionTiming {
        self.timing
    }

    #[must_use]
    pub fn logs(&self) -> &LogHistory {
        &self.logs
    }

    #[must_use]
    pub fn window(&self) -> &Window {
        &self.window
    }

    #[must_use]
    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn stats(&self) -> TickStats {
        self.stats
    }

    #[must_use]
    pub fn tick_counter(&self) -> u64 {
        self.tick_counter
    }

    /// Last error recorded when transitioning to `Error`, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&SessionError> {
        self.last_error.as_ref()
    }

    /// Current simulated time, as of the last `poll`.
    #[must_use]
    pub fn current_time(&self) -> Duration {
        self.current_time
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}
