//! Persisted log entries

use crate::ordered_id;
use crate::record::{Record, RecordKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a persisted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    /// Failure caused by the end user, reported apart from internal errors
    UserError,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::UserError => "user_error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogEntryKey {
    /// Readable ordered identifier; sorts chronologically
    pub timestamp: String,
}

impl RecordKey for LogEntryKey {
    const TABLE: &'static str = "LogEntry";

    fn key_fields(&self) -> Vec<String> {
        vec![self.timestamp.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with a fresh ordered identifier
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: ordered_id::create_one().to_readable_string(),
            level,
            message: message.into(),
        }
    }
}

impl Record for LogEntry {
    type Key = LogEntryKey;
    const TYPE_NAME: &'static str = "LogEntry";

    fn key(&self) -> LogEntryKey {
        LogEntryKey {
            timestamp: self.timestamp.clone(),
        }
    }
}

/// Entry for a failure the end user caused; loads as a [`LogEntry`] as well
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

impl UserLogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: ordered_id::create_one().to_readable_string(),
            level: LogLevel::UserError,
            message: message.into(),
        }
    }
}

impl Record for UserLogEntry {
    type Key = LogEntryKey;
    const TYPE_NAME: &'static str = "UserLogEntry";
    const BASE_TYPES: &'static [&'static str] = &["LogEntry"];

    fn key(&self) -> LogEntryKey {
        LogEntryKey {
            timestamp: self.timestamp.clone(),
        }
    }
}
