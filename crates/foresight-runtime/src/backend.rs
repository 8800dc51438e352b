//! Backend seams for connectivity and modelling.
//!
//! The session controller talks to a [`TagServer`] and a [`Forecaster`]
//! through these traits. The simulated implementations below fabricate a
//! sine-plus-noise process signal and a biased-random-walk forecast; real
//! OPC UA and model backends plug in behind the same seams.

#![allow(missing_docs)]

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng, TryRngCore};

use crate::config::{ModelKind, TagId};
use crate::error::SessionError;

/// Process data access for one session.
pub trait TagServer: Send {
    /// Establish the connection to the configured endpoint.
    fn connect(&mut self, endpoint: &str, username: &str) -> Result<(), SessionError>;

    /// Fetch historical samples for a tag, oldest first.
    fn history(&mut self, tag: TagId, points: usize) -> Result<Vec<f64>, SessionError>;

    /// Read one live sample. `step` is the session tick counter and seeds
    /// the phase of the simulated signal.
    fn read_sample(&mut self, tag: TagId, step: u64) -> Result<f64, SessionError>;

    /// Publish a forecast value to the `Predicted.<tag>` destination.
    fn write_prediction(&mut self, tag: TagId, value: f64) -> Result<(), SessionError>;
}

/// Model training and forecasting for one session.
pub trait Forecaster: Send {
    /// Train the selected model over the historical values and return its
    /// error estimate (MSE).
    fn train(&mut self, model: ModelKind, history: &[f64]) -> Result<f64, SessionError>;

    /// Produce a forward horizon of `steps` values starting after `from`.
    fn forecast(&mut self, from: f64, steps: usize) -> Result<Vec<f64>, SessionError>;
}

fn signal_value(rng: &mut StdRng, phase: f64) -> f64 {
    50.0 + 20.0 * (phase * 0.5).sin() + rng.random_range(-2.5..2.5)
}

/// Default simulated process server.
#[derive(Debug)]
pub struct SimulatedTagServer {
    rng: StdRng,
}

impl SimulatedTagServer {
    #[must_use]
    pub fn new() -> Self {
        let mut seed = [0u8; 32];
        OsRng.unwrap_err().fill_bytes(&mut seed);
        Self {
            rng: StdRng::from_seed(seed),
        }
    }

    /// Deterministic variant for tests and replayable demos.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedTagServer {
    fn default() -> Self {
        Self::new()
    }
}

impl TagServer for SimulatedTagServer {
    fn connect(&mut self, _endpoint: &str, _username: &str) -> Result<(), SessionError> {
        Ok(())
    }

    fn history(&mut self, _tag: TagId, points: usize) -> Result<Vec<f64>, SessionError> {
        // Oldest first: the phase counts down so the newest sample lines up
        // with tick counter zero.
        Ok((0..points)
            .map(|idx| {
                let phase = (points - 1 - idx) as f64;
                signal_value(&mut self.rng, phase)
            })
            .collect())
    }

    fn read_sample(&mut self, _tag: TagId, step: u64) -> Result<f64, SessionError> {
        Ok(signal_value(&mut self.rng, step as f64))
    }

    fn write_prediction(&mut self, _tag: TagId, _value: f64) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Default simulated model backend.
#[derive(Debug)]
pub struct SimulatedForecaster {
    rng: StdRng,
}

impl SimulatedForecaster {
    #[must_use]
    pub fn new() -> Self {
        let mut seed = [0u8; 32];
        OsRng.unwrap_err().fill_bytes(&mut seed);
        Self {
            rng: StdRng::from_seed(seed),
        }
    }

    /// Deterministic variant for tests and replayable demos.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedForecaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Forecaster for SimulatedForecaster {
    fn train(&mut self, _model: ModelKind, history: &[f64]) -> Result<f64, SessionError> {
        if history.is_empty() {
            return Err(SessionError::TrainingFailed(
                "no historical data available".into(),
            ));
        }
        Ok(self.rng.random_range(0.01..0.05))
    }

    fn forecast(&mut self, from: f64, steps: usize) -> Result<Vec<f64>, SessionError> {
        let mut value = from;
        Ok((0..steps)
            .map(|_| {
                value += (self.rng.random_range(0.0..1.0) - 0.48) * 2.0;
                value
            })
            .collect())
    }
}
