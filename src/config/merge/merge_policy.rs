//! Merge rules: defaults, override order, conflict handling.

use crate::config::{default_db_dir, DEFAULT_TEMP_PREFIX};
use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("context.db_temp_prefix", DEFAULT_TEMP_PREFIX)?
        .set_default("context.db_class", "memory")?
        .set_default("context.log_class", "tracing")?
        .set_default(
            "context.db_dir",
            default_db_dir().to_string_lossy().to_string(),
        )?
        .set_default("logging.level", "info")
}
