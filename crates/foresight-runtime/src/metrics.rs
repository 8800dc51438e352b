//! Session metrics collection.

#![allow(missing_docs)]

use smol_str::SmolStr;

/// Derived metrics shown on the dashboard cards.
///
/// The per-tick fields (`current_value`, `predicted_value`, `last_update`)
/// are always replaced together; observers never see a partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMetrics {
    current_value: Option<f64>,
    predicted_value: Option<f64>,
    model_accuracy: Option<f64>,
    last_update: Option<SmolStr>,
}

impl SessionMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the per-tick fields as one unit.
    pub fn record_tick(&mut self, current: f64, predicted: f64, label: SmolStr) {
        self.current_value = Some(current);
        self.predicted_value = Some(predicted);
        self.last_update = Some(label);
    }

    /// Record the training error estimate. Set once per training run.
    pub fn record_training(&mut self, accuracy: f64) {
        self.model_accuracy = Some(accuracy);
    }

    #[must_use]
    pub fn current_value(&self) -> Option<f64> {
        self.current_value
    }

    #[must_use]
    pub fn predicted_value(&self) -> Option<f64> {
        self.predicted_value
    }

    #[must_use]
    pub fn model_accuracy(&self) -> Option<f64> {
        self.model_accuracy
    }

    #[must_use]
    pub fn last_update(&self) -> Option<&SmolStr> {
        self.last_update.as_ref()
    }
}

/// Counters for the prediction loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickStats {
    pub ticks: u64,
    pub skipped: u64,
    pub overruns: u64,
}

impl TickStats {
    pub fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub fn record_skipped(&mut self) {
        self.skipped = self.skipped.saturating_add(1);
    }

    pub fn record_overrun(&mut self, missed: u64) {
        self.overruns = self.overruns.saturating_add(missed);
    }
}
