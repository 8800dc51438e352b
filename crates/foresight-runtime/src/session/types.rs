//! Session shared types.

#![allow(missing_docs)]

use std::time::Duration;

use smol_str::SmolStr;

use crate::config::{ModelKind, TagId};
use crate::log::LogEntry;
use crate::metrics::SessionMetrics;
use crate::status::Status;
use crate::window::ChartPoint;

/// One scheduled delayed transition. At most one is in flight; the command
/// preconditions guarantee no second delayed operation can be queued while
/// one is pending.
#[derive(Debug, Clone)]
pub(super) struct Pending {
    pub due_at: Duration,
    pub step: PendingStep,
}

/// The suspension points of the session state machine. Connect captures
/// the configuration at command-issue time so later config edits cannot
/// affect the in-flight operation.
#[derive(Debug, Clone)]
pub(super) enum PendingStep {
    Connect {
        endpoint: SmolStr,
        username: SmolStr,
        tag: TagId,
        model: ModelKind,
    },
    Train {
        model: ModelKind,
    },
    StopDrain,
}

/// Immutable state view delivered to subscribers on every change.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: Status,
    pub logs: Vec<LogEntry>,
    pub window: Vec<ChartPoint>,
    pub metrics: SessionMetrics,
    /// Monotonic change counter; strictly increases with each delivery.
    pub revision: u64,
}
