use std::time::Duration;

use foresight_runtime::backend::{SimulatedForecaster, SimulatedTagServer, TagServer};
use foresight_runtime::config::{SessionConfig, SessionTiming, TagId};
use foresight_runtime::error::SessionError;
use foresight_runtime::log::LogLevel;
use foresight_runtime::status::Status;
use foresight_runtime::window::{HISTORY_POINTS, WINDOW_CAP};
use foresight_runtime::Session;

fn timing() -> SessionTiming {
    SessionTiming {
        connect_delay: Duration::from_millis(100),
        train_delay: Duration::from_millis(200),
        stop_drain: Duration::from_millis(50),
        tick_interval: Duration::from_secs(1),
    }
}

/// Drive a fresh session to `Ready` at t = 300 ms.
fn ready_session() -> Session {
    let mut session = Session::new(
        SessionConfig::default(),
        timing(),
        Box::new(SimulatedTagServer::with_seed(21)),
        Box::new(SimulatedForecaster::with_seed(22)),
    );
    session.connect_and_train().unwrap();
    session.poll(Duration::from_millis(100));
    session.poll(Duration::from_millis(300));
    assert_eq!(session.status(), Status::Ready);
    session
}

#[test]
fn first_tick_fires_on_start() {
    let mut session = ready_session();
    session.toggle_prediction_loop().unwrap();

    assert_eq!(session.status(), Status::Predicting);
    assert_eq!(session.tick_counter(), 1);
    assert_eq!(session.stats().ticks, 1);

    // One observed slot slid in, one forecast horizon appended.
    assert_eq!(session.window().len(), WINDOW_CAP);
    assert_eq!(session.window().actual_count(), HISTORY_POINTS);

    assert!(session.metrics().current_value().is_some());
    assert!(session.metrics().predicted_value().is_some());
    assert!(session.metrics().last_update().is_some());

    let messages: Vec<_> = session
        .logs()
        .iter()
        .map(|entry| entry.message.as_str())
        .collect();
    assert!(messages.contains(&"Starting prediction loop (1 update every 1 seconds)..."));
    assert_eq!(
        session.logs().last().unwrap().message,
        "Prediction updated for Temperature.Sensor1. Result written to Predicted.Temperature.Sensor1"
    );
}

#[test]
fn ticks_follow_the_cadence() {
    let mut session = ready_session();
    session.toggle_prediction_loop().unwrap();
    assert_eq!(session.tick_counter(), 1);

    // Next tick is due one interval after the start.
    assert!(!session.poll(Duration::from_millis(1200)));
    assert_eq!(session.tick_counter(), 1);
    assert!(session.poll(Duration::from_millis(1300)));
    assert_eq!(session.tick_counter(), 2);
    assert!(session.poll(Duration::from_millis(2300)));
    assert_eq!(session.tick_counter(), 3);

    // Window stays in steady state across ticks.
    assert_eq!(session.window().len(), WINDOW_CAP);
    assert_eq!(session.window().actual_count(), HISTORY_POINTS);
    assert_eq!(session.stats().ticks, 3);
    assert_eq!(session.stats().overruns, 0);

    // Metrics track the newest observed sample, rounded for display.
    let newest = session.window().last_actual().unwrap().actual.unwrap();
    let shown = session.metrics().current_value().unwrap();
    assert!((shown - (newest * 100.0).round() / 100.0).abs() < 1e-9);
}

#[test]
fn overruns_are_counted_not_replayed() {
    let mut session = ready_session();
    session.toggle_prediction_loop().unwrap();

    // 3.5 intervals late: one tick runs, three are chalked up as overruns.
    session.poll(Duration::from_millis(4800));
    assert_eq!(session.tick_counter(), 2);
    assert_eq!(session.stats().overruns, 3);

    // The schedule realigns to the interval grid.
    assert!(!session.poll(Duration::from_millis(5200)));
    assert!(session.poll(Duration::from_millis(5300)));
    assert_eq!(session.tick_counter(), 3);
}

#[test]
fn stop_drains_then_returns_to_ready() {
    let mut session = ready_session();
    session.toggle_prediction_loop().unwrap();
    session.poll(Duration::from_millis(1300));
    let ticks = session.tick_counter();

    session.toggle_prediction_loop().unwrap();
    assert_eq!(session.status(), Status::Stopping);
    let last = session.logs().last().unwrap();
    assert_eq!(last.level, LogLevel::Warn);
    assert_eq!(last.message, "Stopping prediction loop...");

    // No tick may fire once the stop was requested.
    session.poll(Duration::from_millis(1350));
    assert_eq!(session.status(), Status::Ready);
    assert_eq!(
        session.logs().last().unwrap().message,
        "Prediction loop stopped."
    );

    session.poll(Duration::from_secs(30));
    assert_eq!(session.tick_counter(), ticks);
    assert_eq!(session.status(), Status::Ready);

    // Ready permits a restart.
    session.toggle_prediction_loop().unwrap();
    assert_eq!(session.status(), Status::Predicting);
}

#[test]
fn loop_start_rejected_while_stopping() {
    let mut session = ready_session();
    session.toggle_prediction_loop().unwrap();
    session.toggle_prediction_loop().unwrap();
    assert_eq!(session.status(), Status::Stopping);

    let err = session.toggle_prediction_loop().unwrap_err();
    assert!(matches!(err, SessionError::CommandRejected { .. }));
}

/// Server whose live reads always fail; connect and history still work.
struct DeadSampleServer {
    inner: SimulatedTagServer,
}

impl TagServer for DeadSampleServer {
    fn connect(&mut self, endpoint: &str, username: &str) -> Result<(), SessionError> {
        self.inner.connect(endpoint, username)
    }

    fn history(&mut self, tag: TagId, points: usize) -> Result<Vec<f64>, SessionError> {
        self.inner.history(tag, points)
    }

    fn read_sample(&mut self, _tag: TagId, _step: u64) -> Result<f64, SessionError> {
        Err(SessionError::PredictionFailed("sample read timed out".into()))
    }

    fn write_prediction(&mut self, tag: TagId, value: f64) -> Result<(), SessionError> {
        self.inner.write_prediction(tag, value)
    }
}

#[test]
fn failed_tick_is_skipped_without_escalating() {
    let mut session = Session::new(
        SessionConfig::default(),
        timing(),
        Box::new(DeadSampleServer {
            inner: SimulatedTagServer::with_seed(21),
        }),
        Box::new(SimulatedForecaster::with_seed(22)),
    );
    session.connect_and_train().unwrap();
    session.poll(Duration::from_millis(100));
    session.poll(Duration::from_millis(300));

    session.toggle_prediction_loop().unwrap();
    // The loop keeps running; the failed tick left no partial state.
    assert_eq!(session.status(), Status::Predicting);
    assert_eq!(session.window().len(), HISTORY_POINTS);
    assert_eq!(session.window().actual_count(), HISTORY_POINTS);
    assert!(session.metrics().current_value().is_none());
    assert_eq!(session.stats().skipped, 1);
    assert_eq!(session.stats().ticks, 0);

    let last = session.logs().last().unwrap();
    assert_eq!(last.level, LogLevel::Warn);
    assert!(last.message.starts_with("Prediction tick skipped:"));

    session.poll(Duration::from_millis(1300));
    assert_eq!(session.stats().skipped, 2);
    assert_eq!(session.status(), Status::Predicting);
}

#[test]
fn loop_without_data_stays_harmless() {
    let mut session = Session::new(
        SessionConfig::default(),
        timing(),
        Box::new(SimulatedTagServer::with_seed(21)),
        Box::new(SimulatedForecaster::with_seed(22)),
    );

    // Permitted from Disconnected; ticks no-op until data exists.
    session.toggle_prediction_loop().unwrap();
    assert_eq!(session.status(), Status::Predicting);
    assert_eq!(session.tick_counter(), 0);
    assert!(session.window().is_empty());

    session.poll(Duration::from_secs(5));
    assert!(session.window().is_empty());
    assert!(session.metrics().current_value().is_none());
}
