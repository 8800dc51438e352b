//! Session configuration loading.

#![allow(missing_docs)]

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::SessionError;

/// Target tags exposed by the plant data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagId {
    #[default]
    TemperatureSensor1,
    PressureLineA,
    FlowPump3,
    VibrationMotor7B,
}

impl TagId {
    pub const ALL: [Self; 4] = [
        Self::TemperatureSensor1,
        Self::PressureLineA,
        Self::FlowPump3,
        Self::VibrationMotor7B,
    ];

    pub fn parse(text: &str) -> Result<Self, SessionError> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(text))
            .ok_or_else(|| SessionError::InvalidConfig(format!("invalid tag '{text}'").into()))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TemperatureSensor1 => "Temperature.Sensor1",
            Self::PressureLineA => "Pressure.LineA",
            Self::FlowPump3 => "Flow.Pump3",
            Self::VibrationMotor7B => "Vibration.Motor7B",
        }
    }
}

impl std::fmt::Display for TagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forecast model selector. Labels only; the simulated backend does not
/// interpret them beyond log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelKind {
    #[default]
    LightGbm,
    Prophet,
    AutoMl,
}

impl ModelKind {
    pub const ALL: [Self; 3] = [Self::LightGbm, Self::Prophet, Self::AutoMl];

    pub fn parse(text: &str) -> Result<Self, SessionError> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(text))
            .ok_or_else(|| SessionError::InvalidConfig(format!("invalid model '{text}'").into()))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LightGbm => "LightGBM",
            Self::Prophet => "Prophet",
            Self::AutoMl => "AutoML",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection and model selection for one session.
///
/// Commands read the configuration when issued; mutating it afterwards does
/// not affect an in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub endpoint: SmolStr,
    pub username: SmolStr,
    pub tag: TagId,
    pub model: ModelKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: "opc.tcp://192.168.1.100:4840".into(),
            username: "operator".into(),
            tag: TagId::default(),
            model: ModelKind::default(),
        }
    }
}

impl SessionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, SessionTiming), SessionError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            SessionError::InvalidConfig(format!("session.toml: {err}").into())
        })?;
        let raw: SessionToml = toml::from_str(&text).map_err(|err| {
            SessionError::InvalidConfig(format!("session.toml: {err}").into())
        })?;
        raw.into_config()
    }
}

/// Delays for the simulated suspension points and the tick cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub connect_delay: Duration,
    pub train_delay: Duration,
    pub stop_drain: Duration,
    pub tick_interval: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_millis(1500),
            train_delay: Duration::from_millis(3000),
            stop_drain: Duration::from_millis(1000),
            tick_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionToml {
    session: Option<SessionSection>,
    timing: Option<TimingSection>,
}

#[derive(Debug, Deserialize)]
struct SessionSection {
    endpoint: Option<String>,
    username: Option<String>,
    tag: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimingSection {
    connect_delay_ms: Option<u64>,
    train_delay_ms: Option<u64>,
    stop_drain_ms: Option<u64>,
    tick_interval_ms: Option<u64>,
}

impl SessionToml {
    fn into_config(self) -> Result<(SessionConfig, SessionTiming), SessionError> {
        let mut config = SessionConfig::default();
        if let Some(session) = self.session {
            if let Some(endpoint) = session.endpoint {
                if endpoint.trim().is_empty() {
                    return Err(SessionError::InvalidConfig(
                        "session.endpoint must not be empty".into(),
                    ));
                }
                config.endpoint = endpoint.into();
            }
            if let Some(username) = session.username {
                config.username = username.into();
            }
            if let Some(tag) = session.tag {
                config.tag = TagId::parse(&tag)?;
            }
            if let Some(model) = session.model {
                config.model = ModelKind::parse(&model)?;
            }
        }

        let mut timing = SessionTiming::default();
        if let Some(section) = self.timing {
            if let Some(ms) = section.connect_delay_ms {
                timing.connect_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = section.train_delay_ms {
                timing.train_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = section.stop_drain_ms {
                timing.stop_drain = Duration::from_millis(ms);
            }
            if let Some(ms) = section.tick_interval_ms {
                if ms == 0 {
                    return Err(SessionError::InvalidConfig(
                        "timing.tick_interval_ms must be positive".into(),
                    ));
                }
                timing.tick_interval = Duration::from_millis(ms);
            }
        }
        Ok((config, timing))
    }
}
