//! Delayed-transition and prediction-tick execution.

#![allow(missing_docs)]

use std::time::Duration;

use smol_str::SmolStr;
use tracing::warn;

use crate::config::{ModelKind, TagId};
use crate::datetime;
use crate::error::SessionError;
use crate::log::LogLevel;
use crate::status::Status;
use crate::window::{ChartPoint, FORECAST_STEPS, HISTORY_POINTS, WINDOW_CAP};

use super::core::Session;
use super::types::{Pending, PendingStep};

impl Session {
    /// Advance the session to `now`, applying any due delayed transition
    /// and any due prediction tick. Returns whether observable state
    /// changed. Time never moves backwards; a stale `now` is ignored.
    pub fn poll(&mut self, now: Duration) -> bool {
        if now > self.current_time {
            self.current_time = now;
        }
        let mut changed = false;

        let pending_due = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.due_at <= self.current_time);
        if pending_due {
            if let Some(pending) = self.pending.take() {
                self.apply_step(pending.step);
                changed = true;
            }
        }

        if self.status == Status::Predicting {
            if let Some(due) = self.next_tick_due {
                if due <= self.current_time {
                    let interval = self.timing.tick_interval;
                    let behind = self.current_time - due;
                    let missed = (behind.as_nanos() / interval.as_nanos().max(1)) as u64;
                    if missed > 0 {
                        warn!(missed, "prediction ticks overran");
                        self.stats.record_overrun(missed);
                    }
                    self.run_tick();
                    self.next_tick_due = Some(due + interval * (missed as u32 + 1));
                    changed = true;
                }
            }
        }

        if changed {
            self.notify_observers();
        }
        changed
    }

    fn apply_step(&mut self, step: PendingStep) {
        match step {
            PendingStep::Connect {
                endpoint,
                username,
                tag,
                model,
            } => self.complete_connect(&endpoint, &username, tag, model),
            PendingStep::Train { model } => self.complete_training(model),
            PendingStep::StopDrain => {
                self.set_status(Status::Ready);
                self.push_log(LogLevel::Info, "Prediction loop stopped.");
            }
        }
    }

    fn complete_connect(&mut self, endpoint: &str, username: &str, tag: TagId, model: ModelKind) {
        if let Err(err) = self.server.connect(endpoint, username) {
            self.record_error(err);
            return;
        }
        self.push_log(LogLevel::Ok, "Connection successful.");
        self.push_log(LogLevel::Info, "Fetching historical data for training...");
        self.set_status(Status::Training);

        match self.server.history(tag, HISTORY_POINTS) {
            Ok(values) => {
                self.seed_window(&values);
                self.tick_counter = 0;
                self.pending = Some(Pending {
                    due_at: self.current_time + self.timing.train_delay,
                    step: PendingStep::Train { model },
                });
            }
            Err(err) => self.record_error(err),
        }
    }

    /// Seed the window with history points spanning the lookback period at
    /// the tick cadence, newest point closest to now.
    fn seed_window(&mut self, values: &[f64]) {
        let step_secs = self.timing.tick_interval.as_secs() as i64;
        let count = values.len() as i64;
        self.window.seed(values.iter().enumerate().map(|(idx, value)| {
            let back = (count - 1 - idx as i64) * step_secs;
            ChartPoint::actual(datetime::offset_label(-back), *value)
        }));
    }

    fn complete_training(&mut self, model: ModelKind) {
        let history = self.window.actual_values();
        match self.forecaster.train(model, &history) {
            Ok(mse) => {
                let mse = round_to(mse, 4);
                self.metrics.record_training(mse);
                self.push_log(
                    LogLevel::Ok,
                    format!("Model training complete. Algorithm: {model}. Final MSE: {mse:.4}"),
                );
                self.set_status(Status::Ready);
                self.push_log(LogLevel::Info, "Ready to start prediction loop.");
            }
            Err(err) => self.record_error(err),
        }
    }

    /// One prediction tick: one fresh observed sample plus a replaced
    /// forecast horizon. All fallible work happens before any state
    /// mutation, so a failing tick leaves window and metrics untouched.
    pub(super) fn run_tick(&mut self) {
        let Some(tag) = self.loop_tag else {
            return;
        };
        // Defensive: nothing to slide against before training seeds data.
        if self.window.last_actual().is_none() {
            return;
        }

        let value = match self.server.read_sample(tag, self.tick_counter) {
            Ok(value) => value,
            Err(err) => return self.skip_tick(&err),
        };
        let horizon = match self.forecaster.forecast(value, FORECAST_STEPS) {
            Ok(horizon) => horizon,
            Err(err) => return self.skip_tick(&err),
        };

        let label = datetime::now_label();
        let step_secs = self.timing.tick_interval.as_secs() as i64;
        self.window.clear_forecast();
        self.window.slide(ChartPoint::actual(label.clone(), value));
        self.window
            .append_forecast(horizon.iter().enumerate().map(|(idx, forecast)| {
                ChartPoint::predicted(
                    datetime::offset_label((idx as i64 + 1) * step_secs),
                    *forecast,
                )
            }));
        self.window.enforce_cap();
        debug_assert!(self.window.len() <= WINDOW_CAP);

        let predicted = horizon.last().copied().unwrap_or(value);
        self.metrics
            .record_tick(round_to(value, 2), round_to(predicted, 2), label);
        self.tick_counter = self.tick_counter.saturating_add(1);
        self.stats.record_tick();

        if let Err(err) = self.server.write_prediction(tag, predicted) {
            warn!(error = %err, "prediction write failed");
            self.push_log(LogLevel::Warn, format!("Prediction write failed: {err}"));
        } else {
            self.push_log(
                LogLevel::Info,
                format!("Prediction updated for {tag}. Result written to Predicted.{tag}"),
            );
        }
    }

    fn skip_tick(&mut self, err: &SessionError) {
        warn!(error = %err, "prediction tick skipped");
        let message: SmolStr = format!("Prediction tick skipped: {err}").into();
        self.push_log(LogLevel::Warn, message);
        self.stats.record_skipped();
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
