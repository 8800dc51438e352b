//! `foresight-runtime` - session runtime for OPC UA tag forecasting.
//!
//! The crate centers on [`Session`], a state machine sequencing
//! connect → train → predict → stop over simulated time, with a bounded
//! chart-data window, a bounded operator log, and derived metrics. The
//! [`scheduler`] module drives a session on a dedicated thread against a
//! wall or manual clock; the [`backend`] module holds the trait seams for
//! real or simulated process servers and forecast models.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Backend seams and simulated implementations.
pub mod backend;
/// Session configuration loading.
pub mod config;
mod datetime;
/// Session errors.
pub mod error;
/// Bounded session log history.
pub mod log;
/// Session metrics collection.
pub mod metrics;
/// Session scheduling helpers and clocks.
pub mod scheduler;
/// Session status values.
pub mod status;
/// Bounded chart-data window.
pub mod window;

mod session;

pub use session::{Session, SessionSnapshot};
