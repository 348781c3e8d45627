//! Error types for the execution context, persistence gateway and identifiers.

use thiserror::Error;

/// Storage-related errors raised by database backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Error taxonomy shared by every operation that surfaces a [`ContextError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    Consistency,
    Permission,
    UserFacing,
    Storage,
}

/// Errors raised by contexts, the persistence gateway and identifier utilities
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    /// Failure caused by the end user rather than by the system
    #[error("{0}")]
    User(String),

    #[error("Invalid identifier format: {0}")]
    IdFormat(String),

    #[error("Identifier version mismatch: expected v{expected}, got v{actual}")]
    IdVersion { expected: usize, actual: usize },

    #[error("Record type mismatch: expected {expected} or its subtype, stored record is {actual}")]
    RecordType { expected: String, actual: String },

    #[error("Invalid dataset: {0}")]
    Dataset(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ContextError {
    /// Create a user-facing error
    pub fn user(message: impl Into<String>) -> Self {
        ContextError::User(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ContextError::Config(_) | ContextError::IdFormat(_) | ContextError::Dataset(_) => {
                ErrorKind::Configuration
            }
            ContextError::NotFound(_) => ErrorKind::NotFound,
            ContextError::Consistency(_)
            | ContextError::IdVersion { .. }
            | ContextError::RecordType { .. } => ErrorKind::Consistency,
            ContextError::Permission(_) => ErrorKind::Permission,
            ContextError::User(_) => ErrorKind::UserFacing,
            ContextError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn is_user_error(&self) -> bool {
        self.kind() == ErrorKind::UserFacing
    }
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ContextError {
    fn from(err: serde_json::Error) -> Self {
        ContextError::Storage(StorageError::Serialization(err))
    }
}

impl From<sled::Error> for ContextError {
    fn from(err: sled::Error) -> Self {
        ContextError::Storage(StorageError::from(err))
    }
}
