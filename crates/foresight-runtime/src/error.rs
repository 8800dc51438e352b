//! Session errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

use crate::status::Status;

/// Errors surfaced by session commands and backends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The configured endpoint could not be reached.
    #[error("connection failed '{0}'")]
    ConnectionFailed(SmolStr),

    /// Model training did not complete.
    #[error("training failed '{0}'")]
    TrainingFailed(SmolStr),

    /// A single prediction tick could not be computed.
    #[error("prediction failed '{0}'")]
    PredictionFailed(SmolStr),

    /// A command was issued in a status that does not permit it.
    #[error("command '{command}' rejected in status {status}")]
    CommandRejected { command: SmolStr, status: Status },

    /// Configuration error.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),

    /// Thread spawn error.
    #[error("thread spawn error '{0}'")]
    ThreadSpawn(SmolStr),

    /// Control channel error.
    #[error("control error '{0}'")]
    ControlError(SmolStr),
}

impl SessionError {
    /// Build a rejection error for a named command.
    #[must_use]
    pub fn rejected(command: &str, status: Status) -> Self {
        Self::CommandRejected {
            command: command.into(),
            status,
        }
    }
}
