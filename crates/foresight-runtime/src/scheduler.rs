//! Session scheduling utilities and clocks.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::{Session, SessionSnapshot};
use crate::status::Status;

/// Clock interface for session scheduling.
pub trait Clock: Send + Sync + 'static {
    /// Return the current time for scheduling.
    fn now(&self) -> Duration;

    /// Sleep until the given deadline.
    fn sleep_until(&self, deadline: Duration);

    /// Wake any sleepers (best-effort).
    fn wake(&self) {
        // Default: no-op for clocks without a wait mechanism.
    }
}

/// Monotonic clock based on `std::time::Instant`.
#[derive(Debug, Clone)]
pub struct StdClock {
    start: std::time::Instant,
}

impl StdClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep_until(&self, deadline: Duration) {
        let now = self.now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
    }
}

#[derive(Debug)]
struct ManualClockState {
    now: Duration,
    sleep_calls: u64,
    interrupted: bool,
}

/// Deterministic clock for tests and simulations.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<(Mutex<ManualClockState>, Condvar)>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new((
                Mutex::new(ManualClockState {
                    now: Duration::ZERO,
                    sleep_calls: 0,
                    interrupted: false,
                }),
                Condvar::new(),
            )),
        }
    }

    /// Return the current manual time.
    #[must_use]
    pub fn current_time(&self) -> Duration {
        let (lock, _) = &*self.inner;
        let state = lock.lock().expect("manual clock lock poisoned");
        state.now
    }

    /// Advance time by the given delta.
    pub fn advance(&self, delta: Duration) -> Duration {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("manual clock lock poisoned");
        state.now = state.now.saturating_add(delta);
        cvar.notify_all();
        state.now
    }

    /// Set the current time explicitly.
    pub fn set_time(&self, time: Duration) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("manual clock lock poisoned");
        state.now = time;
        cvar.notify_all();
    }

    /// Number of sleep calls issued to this clock.
    #[must_use]
    pub fn sleep_calls(&self) -> u64 {
        let (lock, _) = &*self.inner;
        let state = lock.lock().expect("manual clock lock poisoned");
        state.sleep_calls
    }

    /// Interrupt the next (or current) sleep. Consumed by the sleeper.
    pub fn interrupt(&self) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("manual clock lock poisoned");
        state.interrupted = true;
        cvar.notify_all();
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.current_time()
    }

    fn sleep_until(&self, deadline: Duration) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("manual clock lock poisoned");
        state.sleep_calls = state.sleep_calls.saturating_add(1);
        while !state.interrupted && state.now < deadline {
            state = cvar.wait(state).expect("manual clock wait poisoned");
        }
        state.interrupted = false;
    }

    fn wake(&self) {
        self.interrupt();
    }
}

/// Commands applied to a running session thread.
pub enum SessionCommand {
    ConnectAndTrain {
        respond_to: Sender<Result<(), SessionError>>,
    },
    ToggleLoop {
        respond_to: Sender<Result<(), SessionError>>,
    },
    SetConfig(SessionConfig),
    GetConfig {
        respond_to: Sender<SessionConfig>,
    },
    Snapshot {
        respond_to: Sender<SessionSnapshot>,
    },
    Subscribe {
        respond_to: Sender<Receiver<SessionSnapshot>>,
    },
}

/// Drives a session with a scheduling clock.
pub struct SessionRunner<C: Clock + Clone> {
    session: Session,
    clock: C,
    poll_interval: Duration,
    command_rx: Option<Receiver<SessionCommand>>,
}

impl<C: Clock + Clone> SessionRunner<C> {
    #[must_use]
    pub fn new(session: Session, clock: C, poll_interval: Duration) -> Self {
        Self {
            session,
            clock,
            poll_interval,
            command_rx: None,
        }
    }

    /// Access the underlying session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutate the underlying session.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Apply one poll using the current clock time.
    pub fn tick(&mut self) -> bool {
        let now = self.clock.now();
        self.session.poll(now)
    }

    /// Spawn the runner in a dedicated OS thread.
    pub fn spawn(self, name: impl Into<String>) -> Result<SessionHandle<C>, SessionError> {
        let stop = Arc::new(AtomicBool::new(false));
        let status = Arc::new(Mutex::new(self.session.status()));
        let clock = self.clock.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let mut runner = self;
        runner.command_rx = Some(cmd_rx);

        let stop_thread = stop.clone();
        let status_thread = status.clone();

        let builder = thread::Builder::new().name(name.into());
        let join = builder
            .spawn(move || run_session_loop(runner, &stop_thread, &status_thread))
            .map_err(|err| SessionError::ThreadSpawn(err.to_string().into()))?;

        Ok(SessionHandle {
            stop,
            status,
            clock,
            join: Some(join),
            cmd_tx,
        })
    }
}

fn run_session_loop<C: Clock + Clone>(
    mut runner: SessionRunner<C>,
    stop: &AtomicBool,
    status: &Mutex<Status>,
) {
    loop {
        if stop.load(Ordering::SeqCst) {
            runner.session.dispose();
            break;
        }

        if let Some(commands) = runner.command_rx.as_ref() {
            while let Ok(command) = commands.try_recv() {
                apply_session_command(&mut runner.session, command);
            }
        }

        let now = runner.clock.now();
        runner.session.poll(now);
        *status.lock().expect("session status poisoned") = runner.session.status();

        let deadline = now.saturating_add(runner.poll_interval);
        runner.clock.sleep_until(deadline);
    }
}

fn apply_session_command(session: &mut Session, command: SessionCommand) {
    match command {
        SessionCommand::ConnectAndTrain { respond_to } => {
            let _ = respond_to.send(session.connect_and_train());
        }
        SessionCommand::ToggleLoop { respond_to } => {
            let _ = respond_to.send(session.toggle_prediction_loop());
        }
        SessionCommand::SetConfig(config) => session.set_config(config),
        SessionCommand::GetConfig { respond_to } => {
            let _ = respond_to.send(session.config().clone());
        }
        SessionCommand::Snapshot { respond_to } => {
            let _ = respond_to.send(session.snapshot());
        }
        SessionCommand::Subscribe { respond_to } => {
            let _ = respond_to.send(session.subscribe());
        }
    }
}

/// Handle to a running session thread.
pub struct SessionHandle<C: Clock + Clone> {
    stop: Arc<AtomicBool>,
    status: Arc<Mutex<Status>>,
    clock: C,
    join: Option<thread::JoinHandle<()>>,
    cmd_tx: Sender<SessionCommand>,
}

impl<C: Clock + Clone> SessionHandle<C> {
    /// Cloneable control handle for external management.
    #[must_use]
    pub fn control(&self) -> SessionControl<C> {
        SessionControl {
            cmd_tx: self.cmd_tx.clone(),
            clock: self.clock.clone(),
        }
    }

    /// Signal the session thread to stop. Idempotent.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.clock.wake();
    }

    /// Last status published by the session thread.
    #[must_use]
    pub fn status(&self) -> Status {
        *self.status.lock().expect("session status poisoned")
    }

    /// Join the session thread.
    pub fn join(&mut self) -> thread::Result<()> {
        if let Some(join) = self.join.take() {
            return join.join();
        }
        Ok(())
    }
}

impl<C: Clock + Clone> Drop for SessionHandle<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Lightweight control handle for a running session.
#[derive(Clone)]
pub struct SessionControl<C: Clock + Clone> {
    cmd_tx: Sender<SessionCommand>,
    clock: C,
}

impl<C: Clock + Clone> SessionControl<C> {
    /// Request the connect-and-train sequence.
    pub fn connect_and_train(&self) -> Result<(), SessionError> {
        let (tx, rx) = mpsc::channel();
        self.send(SessionCommand::ConnectAndTrain { respond_to: tx })?;
        self.recv(&rx)?
    }

    /// Toggle the prediction loop.
    pub fn toggle_prediction_loop(&self) -> Result<(), SessionError> {
        let (tx, rx) = mpsc::channel();
        self.send(SessionCommand::ToggleLoop { respond_to: tx })?;
        self.recv(&rx)?
    }

    /// Replace the session configuration.
    pub fn set_config(&self, config: SessionConfig) -> Result<(), SessionError> {
        self.send(SessionCommand::SetConfig(config))
    }

    /// Read the session configuration.
    pub fn config(&self) -> Result<SessionConfig, SessionError> {
        let (tx, rx) = mpsc::channel();
        self.send(SessionCommand::GetConfig { respond_to: tx })?;
        self.recv(&rx)
    }

    /// Take one immutable state snapshot.
    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (tx, rx) = mpsc::channel();
        self.send(SessionCommand::Snapshot { respond_to: tx })?;
        self.recv(&rx)
    }

    /// Register an observer delivered one snapshot per change.
    pub fn subscribe(&self) -> Result<Receiver<SessionSnapshot>, SessionError> {
        let (tx, rx) = mpsc::channel();
        self.send(SessionCommand::Subscribe { respond_to: tx })?;
        self.recv(&rx)
    }

    fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.cmd_tx
            .send(command)
            .map_err(|_| SessionError::ControlError("command channel closed".into()))?;
        self.clock.wake();
        Ok(())
    }

    fn recv<T>(&self, rx: &Receiver<T>) -> Result<T, SessionError> {
        rx.recv()
            .map_err(|_| SessionError::ControlError("session thread exited".into()))
    }
}
