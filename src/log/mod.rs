//! Log sinks
//!
//! A context carries a [`Log`] handle. Named [`Logger`]s obtained from it emit `tracing`
//! events tagged with the log identifier; entries that must outlive the process are
//! created with [`Log::create_entry`] and saved through the context database.

pub mod entry;

pub use entry::{LogEntry, LogEntryKey, LogLevel, UserLogEntry};

use crate::record::{Record, RecordKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Log sink contract
pub trait Log: Send + Sync {
    fn log_id(&self) -> &str;

    fn log_key(&self) -> LogKey {
        LogKey::new(self.log_id())
    }

    /// Named logger handle
    fn get_logger(&self, name: &str) -> Logger;

    /// Build an entry for persistence. User errors become a [`UserLogEntry`].
    fn create_entry(&self, level: LogLevel, message: &str) -> LogRecord {
        match level {
            LogLevel::UserError => LogRecord::User(UserLogEntry::new(message)),
            level => LogRecord::Entry(LogEntry::new(level, message)),
        }
    }
}

/// Entry produced by [`Log::create_entry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    Entry(LogEntry),
    User(UserLogEntry),
}

impl LogRecord {
    pub fn message(&self) -> &str {
        match self {
            LogRecord::Entry(entry) => &entry.message,
            LogRecord::User(entry) => &entry.message,
        }
    }
}

/// Named handle emitting `tracing` events
#[derive(Debug, Clone)]
pub struct Logger {
    log_id: Arc<str>,
    name: String,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        let log_id = &*self.log_id;
        let logger = self.name.as_str();
        match level {
            LogLevel::Debug => debug!(log_id, logger, "{}", message),
            LogLevel::Info => info!(log_id, logger, "{}", message),
            LogLevel::Warning => warn!(log_id, logger, "{}", message),
            LogLevel::Error => error!(log_id, logger, "{}", message),
            LogLevel::UserError => warn!(log_id, logger, user_error = true, "{}", message),
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Default sink forwarding to the process `tracing` subscriber
#[derive(Debug, Clone)]
pub struct TracingLog {
    log_id: Arc<str>,
}

impl TracingLog {
    pub fn new(log_id: &str) -> Self {
        Self {
            log_id: Arc::from(log_id),
        }
    }
}

impl Log for TracingLog {
    fn log_id(&self) -> &str {
        &self.log_id
    }

    fn get_logger(&self, name: &str) -> Logger {
        Logger {
            log_id: Arc::clone(&self.log_id),
            name: name.to_string(),
        }
    }
}

/// Log sink selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogClass {
    #[default]
    Tracing,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogKey {
    pub log_id: String,
}

impl LogKey {
    pub fn new(log_id: impl Into<String>) -> Self {
        Self {
            log_id: log_id.into(),
        }
    }
}

impl RecordKey for LogKey {
    const TABLE: &'static str = "Log";

    fn key_fields(&self) -> Vec<String> {
        vec![self.log_id.clone()]
    }
}

/// Stored description of a log sink, used to open it from a [`LogKey`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSpec {
    pub log_id: String,
    #[serde(default)]
    pub log_class: LogClass,
}

impl LogSpec {
    pub fn new(log_id: impl Into<String>, log_class: LogClass) -> Self {
        Self {
            log_id: log_id.into(),
            log_class,
        }
    }

    pub fn open(&self) -> Arc<dyn Log> {
        match self.log_class {
            LogClass::Tracing => Arc::new(TracingLog::new(&self.log_id)),
        }
    }
}

impl Record for LogSpec {
    type Key = LogKey;
    const TYPE_NAME: &'static str = "LogSpec";

    fn key(&self) -> LogKey {
        LogKey::new(&self.log_id)
    }
}
