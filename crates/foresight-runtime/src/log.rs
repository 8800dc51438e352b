//! Bounded session log history.

#![allow(missing_docs)]

use std::collections::VecDeque;

use smol_str::SmolStr;

use crate::datetime;

/// Maximum entries retained: 200 prior entries plus the newest append.
pub const LOG_HISTORY_CAP: usize = 201;

/// Severity of a session log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Ok,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable log line shown to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: SmolStr,
    pub level: LogLevel,
    pub message: SmolStr,
}

/// Append-only log history trimmed to [`LOG_HISTORY_CAP`] entries.
#[derive(Debug, Clone, Default)]
pub struct LogHistory {
    entries: VecDeque<LogEntry>,
}

impl LogHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the current local time.
    pub fn push(&mut self, level: LogLevel, message: impl Into<SmolStr>) {
        self.push_entry(LogEntry {
            timestamp: datetime::now_label(),
            level,
            message: message.into(),
        });
    }

    pub fn push_entry(&mut self, entry: LogEntry) {
        while self.entries.len() >= LOG_HISTORY_CAP {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Immutable copy for observer snapshots.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_bounded() {
        let mut history = LogHistory::new();
        for i in 0..500 {
            history.push(LogLevel::Info, format!("entry {i}"));
            assert!(history.len() <= LOG_HISTORY_CAP);
        }
        assert_eq!(history.len(), LOG_HISTORY_CAP);
        // Oldest entries dropped first.
        assert_eq!(history.iter().next().unwrap().message, "entry 299");
        assert_eq!(history.last().unwrap().message, "entry 499");
    }
}
