use std::time::Duration;

use foresight_runtime::backend::{
    Forecaster, SimulatedForecaster, SimulatedTagServer, TagServer,
};
use foresight_runtime::config::{ModelKind, SessionConfig, SessionTiming, TagId};
use foresight_runtime::error::SessionError;
use foresight_runtime::log::LogLevel;
use foresight_runtime::status::Status;
use foresight_runtime::window::HISTORY_POINTS;
use foresight_runtime::Session;

fn timing() -> SessionTiming {
    SessionTiming {
        connect_delay: Duration::from_millis(100),
        train_delay: Duration::from_millis(200),
        stop_drain: Duration::from_millis(50),
        tick_interval: Duration::from_secs(1),
    }
}

fn session() -> Session {
    Session::new(
        SessionConfig::default(),
        timing(),
        Box::new(SimulatedTagServer::with_seed(7)),
        Box::new(SimulatedForecaster::with_seed(8)),
    )
}

#[test]
fn connect_and_train_reaches_ready() {
    let mut session = session();
    assert_eq!(session.status(), Status::Disconnected);

    session.connect_and_train().unwrap();
    assert_eq!(session.status(), Status::Connecting);
    let first = session.logs().iter().next().unwrap();
    assert_eq!(first.level, LogLevel::Info);
    assert!(first
        .message
        .starts_with("Attempting to connect to OPC UA server at opc.tcp://"));

    // Connect completes, history is fetched, training starts.
    session.poll(Duration::from_millis(100));
    assert_eq!(session.status(), Status::Training);
    assert_eq!(session.window().len(), HISTORY_POINTS);
    assert_eq!(session.window().actual_count(), HISTORY_POINTS);
    let messages: Vec<_> = session
        .logs()
        .iter()
        .map(|entry| entry.message.as_str())
        .collect();
    assert!(messages.contains(&"Connection successful."));
    assert!(messages.contains(&"Fetching historical data for training..."));

    // Seeded signal stays inside the sine-plus-noise band.
    for value in session.window().actual_values() {
        assert!((27.5..72.5).contains(&value), "value out of band: {value}");
    }

    // Training completes.
    session.poll(Duration::from_millis(300));
    assert_eq!(session.status(), Status::Ready);
    let mse = session.metrics().model_accuracy().unwrap();
    assert!((0.009..0.0501).contains(&mse), "mse out of range: {mse}");
    let last = session.logs().last().unwrap();
    assert_eq!(last.message, "Ready to start prediction loop.");
    assert!(session.logs().len() >= 4);
}

#[test]
fn connect_rejected_while_busy() {
    let mut session = session();
    session.connect_and_train().unwrap();
    let logs_before = session.logs().len();

    let err = session.connect_and_train().unwrap_err();
    assert!(matches!(
        err,
        SessionError::CommandRejected {
            status: Status::Connecting,
            ..
        }
    ));
    // Rejection leaves no trace in the operator log.
    assert_eq!(session.logs().len(), logs_before);
    assert_eq!(session.status(), Status::Connecting);

    session.poll(Duration::from_millis(100));
    assert!(session.connect_and_train().is_err());
    assert_eq!(session.status(), Status::Training);
}

#[test]
fn retrain_permitted_from_ready() {
    let mut session = session();
    session.connect_and_train().unwrap();
    session.poll(Duration::from_millis(100));
    session.poll(Duration::from_millis(300));
    assert_eq!(session.status(), Status::Ready);

    session.connect_and_train().unwrap();
    assert_eq!(session.status(), Status::Connecting);
    session.poll(Duration::from_millis(400));
    session.poll(Duration::from_millis(600));
    assert_eq!(session.status(), Status::Ready);
}

#[test]
fn loop_start_rejected_while_training() {
    let mut session = session();
    session.connect_and_train().unwrap();
    session.poll(Duration::from_millis(100));
    assert_eq!(session.status(), Status::Training);

    let err = session.toggle_prediction_loop().unwrap_err();
    assert!(matches!(err, SessionError::CommandRejected { .. }));
    assert_eq!(session.status(), Status::Training);
}

/// Server that refuses the first `failures` connect attempts.
struct FlakyServer {
    inner: SimulatedTagServer,
    failures: u32,
}

impl TagServer for FlakyServer {
    fn connect(&mut self, endpoint: &str, username: &str) -> Result<(), SessionError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(SessionError::ConnectionFailed("endpoint unreachable".into()));
        }
        self.inner.connect(endpoint, username)
    }

    fn history(&mut self, tag: TagId, points: usize) -> Result<Vec<f64>, SessionError> {
        self.inner.history(tag, points)
    }

    fn read_sample(&mut self, tag: TagId, step: u64) -> Result<f64, SessionError> {
        self.inner.read_sample(tag, step)
    }

    fn write_prediction(&mut self, tag: TagId, value: f64) -> Result<(), SessionError> {
        self.inner.write_prediction(tag, value)
    }
}

#[test]
fn connect_failure_recovers_on_retry() {
    let mut session = Session::new(
        SessionConfig::default(),
        timing(),
        Box::new(FlakyServer {
            inner: SimulatedTagServer::with_seed(7),
            failures: 1,
        }),
        Box::new(SimulatedForecaster::with_seed(8)),
    );

    session.connect_and_train().unwrap();
    session.poll(Duration::from_millis(100));
    assert_eq!(session.status(), Status::Error);
    let last = session.logs().last().unwrap();
    assert_eq!(last.level, LogLevel::Error);
    assert!(matches!(
        session.last_error(),
        Some(SessionError::ConnectionFailed(_))
    ));

    // Error permits another attempt; the second connect succeeds.
    session.connect_and_train().unwrap();
    session.poll(Duration::from_millis(200));
    assert_eq!(session.status(), Status::Training);
    session.poll(Duration::from_millis(400));
    assert_eq!(session.status(), Status::Ready);
}

struct BrokenForecaster;

impl Forecaster for BrokenForecaster {
    fn train(&mut self, _model: ModelKind, _history: &[f64]) -> Result<f64, SessionError> {
        Err(SessionError::TrainingFailed("model diverged".into()))
    }

    fn forecast(&mut self, _from: f64, _steps: usize) -> Result<Vec<f64>, SessionError> {
        Err(SessionError::PredictionFailed("no trained model".into()))
    }
}

#[test]
fn training_failure_sets_error_status() {
    let mut session = Session::new(
        SessionConfig::default(),
        timing(),
        Box::new(SimulatedTagServer::with_seed(7)),
        Box::new(BrokenForecaster),
    );

    session.connect_and_train().unwrap();
    session.poll(Duration::from_millis(100));
    session.poll(Duration::from_millis(300));
    assert_eq!(session.status(), Status::Error);
    assert!(matches!(
        session.last_error(),
        Some(SessionError::TrainingFailed(_))
    ));
    // The error is also visible to operators.
    let last = session.logs().last().unwrap();
    assert_eq!(last.level, LogLevel::Error);
    assert!(last.message.contains("model diverged"));
}

#[test]
fn observers_receive_snapshots_per_change() {
    let mut session = session();
    let updates = session.subscribe();

    // Initial snapshot on subscribe.
    let initial = updates.recv().unwrap();
    assert_eq!(initial.status, Status::Disconnected);
    assert!(initial.logs.is_empty());

    session.connect_and_train().unwrap();
    let connecting = updates.recv().unwrap();
    assert_eq!(connecting.status, Status::Connecting);
    assert!(connecting.revision > initial.revision);

    session.poll(Duration::from_millis(100));
    let training = updates.recv().unwrap();
    assert_eq!(training.status, Status::Training);
    assert_eq!(training.window.len(), HISTORY_POINTS);

    session.poll(Duration::from_millis(300));
    let ready = updates.recv().unwrap();
    assert_eq!(ready.status, Status::Ready);
    assert!(ready.metrics.model_accuracy().is_some());
}

#[test]
fn dispose_is_idempotent() {
    let mut session = session();
    session.connect_and_train().unwrap();
    session.dispose();
    session.dispose();

    // The pending connect was cancelled; time passing changes nothing.
    session.poll(Duration::from_secs(10));
    assert_eq!(session.status(), Status::Connecting);
    assert_eq!(session.window().len(), 0);
}
