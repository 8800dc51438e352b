//! Bounded chart-data window merging observed samples and forecasts.

#![allow(missing_docs)]

use std::collections::VecDeque;

use smol_str::SmolStr;

/// Logical window capacity: 61 history slots plus one forecast horizon.
pub const WINDOW_CAP: usize = 67;

/// Actual points seeded when a training session starts.
pub const HISTORY_POINTS: usize = 61;

/// Forecast horizon length produced by each prediction tick.
pub const FORECAST_STEPS: usize = 6;

/// One chart sample. Carries an observed value, a forecast value, or
/// (after coalescing) both for the same time slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub time: SmolStr,
    pub actual: Option<f64>,
    pub predicted: Option<f64>,
}

impl ChartPoint {
    #[must_use]
    pub fn actual(time: impl Into<SmolStr>, value: f64) -> Self {
        Self {
            time: time.into(),
            actual: Some(value),
            predicted: None,
        }
    }

    #[must_use]
    pub fn predicted(time: impl Into<SmolStr>, value: f64) -> Self {
        Self {
            time: time.into(),
            actual: None,
            predicted: Some(value),
        }
    }
}

/// Age-ordered chart points, trimmed to [`WINDOW_CAP`] entries.
#[derive(Debug, Clone, Default)]
pub struct Window {
    points: VecDeque<ChartPoint>,
}

impl Window {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the window contents with freshly seeded history points.
    pub fn seed(&mut self, points: impl IntoIterator<Item = ChartPoint>) {
        self.points = points.into_iter().collect();
        self.enforce_cap();
    }

    /// Slide the window forward by exactly one: drop the oldest entry and
    /// append a new observed sample.
    pub fn slide(&mut self, point: ChartPoint) {
        self.points.pop_front();
        self.points.push_back(point);
    }

    /// Drop forecast-only points so a new horizon can replace them.
    pub fn clear_forecast(&mut self) {
        self.points.retain(|point| point.actual.is_some());
    }

    /// Append forecast points while the window has room.
    pub fn append_forecast(&mut self, points: impl IntoIterator<Item = ChartPoint>) {
        for point in points {
            if self.points.len() >= WINDOW_CAP {
                break;
            }
            self.points.push_back(point);
        }
    }

    /// Enforcement point of the capacity invariant, independent of the
    /// fit checks performed while appending.
    pub fn enforce_cap(&mut self) {
        while self.points.len() > WINDOW_CAP {
            self.points.pop_front();
        }
    }

    /// Most recent entry carrying an observed value.
    #[must_use]
    pub fn last_actual(&self) -> Option<&ChartPoint> {
        self.points.iter().rev().find(|point| point.actual.is_some())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn actual_count(&self) -> usize {
        self.points.iter().filter(|point| point.actual.is_some()).count()
    }

    /// Observed values oldest-first, as fed to model training.
    #[must_use]
    pub fn actual_values(&self) -> Vec<f64> {
        self.points.iter().filter_map(|point| point.actual).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChartPoint> {
        self.points.iter()
    }

    /// Immutable copy for observer snapshots.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChartPoint> {
        self.points.iter().cloned().collect()
    }
}
