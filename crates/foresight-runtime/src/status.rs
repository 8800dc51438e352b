//! Session status values and transition guards.

#![allow(missing_docs)]

use crate::error::SessionError;

/// Lifecycle status of a forecasting session.
///
/// Exactly one status is active at a time and drives which commands are
/// permitted. `Ready` is the post-training state from which the prediction
/// loop may start; it is distinct from `Disconnected` (no trained model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Disconnected,
    Connecting,
    Training,
    Ready,
    Predicting,
    Stopping,
    Error,
}

impl Status {
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "disconnected" => Ok(Self::Disconnected),
            "connecting" => Ok(Self::Connecting),
            "training" => Ok(Self::Training),
            "ready" => Ok(Self::Ready),
            "predicting" => Ok(Self::Predicting),
            "stopping" => Ok(Self::Stopping),
            "error" => Ok(Self::Error),
            _ => Err(SessionError::InvalidConfig(
                format!("invalid status '{text}'").into(),
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Training => "TRAINING",
            Self::Ready => "READY",
            Self::Predicting => "PREDICTING",
            Self::Stopping => "STOPPING",
            Self::Error => "ERROR",
        }
    }

    /// Whether `connect_and_train` is permitted from this status.
    #[must_use]
    pub fn permits_connect(self) -> bool {
        matches!(self, Self::Disconnected | Self::Ready | Self::Error)
    }

    /// Whether starting the prediction loop is permitted from this status.
    ///
    /// Connect and train phases must never be interleaved with the loop;
    /// the stop drain counts as busy as well.
    #[must_use]
    pub fn permits_loop_start(self) -> bool {
        !matches!(self, Self::Connecting | Self::Training | Self::Stopping)
    }

    /// Whether a delayed transition is currently in flight.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Connecting | Self::Training | Self::Stopping)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        for status in [
            Status::Disconnected,
            Status::Connecting,
            Status::Training,
            Status::Ready,
            Status::Predicting,
            Status::Stopping,
            Status::Error,
        ] {
            assert_eq!(Status::parse(status.as_str()).unwrap(), status);
        }
        assert!(Status::parse("paused").is_err());
    }

    #[test]
    fn guards_match_the_transition_table() {
        assert!(Status::Disconnected.permits_connect());
        assert!(Status::Ready.permits_connect());
        assert!(Status::Error.permits_connect());
        assert!(!Status::Connecting.permits_connect());
        assert!(!Status::Predicting.permits_connect());

        assert!(Status::Ready.permits_loop_start());
        assert!(!Status::Training.permits_loop_start());
        assert!(!Status::Stopping.permits_loop_start());
        assert!(Status::Training.is_busy());
        assert!(!Status::Ready.is_busy());
    }
}
