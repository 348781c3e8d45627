//! Configuration System
//!
//! Layered settings for contexts and process logging. Sources are merged with the
//! `config` crate, lowest precedence first: built-in defaults, the global file, the
//! workspace files, then `CTXRT__SECTION__KEY` environment variables.

use crate::db::DbClass;
use crate::error::ContextError;
use crate::log::LogClass;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, warn};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Default prefix marking databases whose contents may be destroyed
pub const DEFAULT_TEMP_PREFIX: &str = "temp;";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub context: ContextSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ContextError> {
        self.context.validate()?;
        self.logging.validate()
    }
}

/// Settings consumed when building root contexts and opening backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSettings {
    /// Identifier of the process root context; generated when not set
    #[serde(default)]
    pub context_id: Option<String>,

    /// Sink class used for root contexts
    #[serde(default)]
    pub log_class: LogClass,

    /// Backend class used for root contexts
    #[serde(default)]
    pub db_class: DbClass,

    /// Only databases whose identifier starts with this prefix may be dropped
    #[serde(default = "default_temp_prefix")]
    pub db_temp_prefix: String,

    /// Directory holding file-backed databases
    #[serde(default = "default_db_dir")]
    pub db_dir: PathBuf,
}

fn default_temp_prefix() -> String {
    DEFAULT_TEMP_PREFIX.to_string()
}

pub(crate) fn default_db_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "ctxrt")
        .map(|dirs| dirs.data_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from(".ctxrt/db"))
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            context_id: None,
            log_class: LogClass::default(),
            db_class: DbClass::default(),
            db_temp_prefix: default_temp_prefix(),
            db_dir: default_db_dir(),
        }
    }
}

static SETTINGS: OnceLock<ContextSettings> = OnceLock::new();

impl ContextSettings {
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.db_temp_prefix.is_empty() {
            return Err(ContextError::Config(
                "context.db_temp_prefix cannot be empty".to_string(),
            ));
        }
        if matches!(&self.context_id, Some(id) if id.trim().is_empty()) {
            return Err(ContextError::Config(
                "context.context_id cannot be empty when set".to_string(),
            ));
        }
        if self.db_dir.as_os_str().is_empty() {
            return Err(ContextError::Config(
                "context.db_dir cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Process-wide settings.
    ///
    /// Loaded from the current directory on first use unless [`ContextSettings::install`]
    /// ran before. Falls back to defaults when loading fails.
    pub fn instance() -> &'static ContextSettings {
        SETTINGS.get_or_init(|| {
            let loaded = std::env::current_dir()
                .map_err(|e| ContextError::Config(format!("Cannot read current directory: {}", e)))
                .and_then(|dir| ConfigLoader::load(&dir))
                .and_then(|config| config.context.validate().map(|_| config.context));
            match loaded {
                Ok(settings) => {
                    debug!(?settings, "Loaded context settings");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load context settings, using defaults");
                    ContextSettings::default()
                }
            }
        })
    }

    /// Install the process-wide settings; fails once they are set
    pub fn install(settings: ContextSettings) -> Result<(), ContextError> {
        settings.validate()?;
        SETTINGS.set(settings).map_err(|_| {
            ContextError::Config("Context settings are already initialized".to_string())
        })
    }
}
