//! Loading entry points over the layered sources.

use super::merge::merge_policy;
use super::sources::{environment, global_file};
use super::RuntimeConfig;
use crate::error::ContextError;
use config::builder::DefaultState;
use config::{ConfigBuilder, File};
use std::path::{Path, PathBuf};

/// Selects `config/{name}.toml` on top of `config/config.toml`
pub const ENV_NAME_VAR: &str = "CTXRT_ENV";

/// Loads [`RuntimeConfig`] from files and the environment
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load every layer for a workspace: defaults, global file, workspace files, environment
    pub fn load(workspace_root: &Path) -> Result<RuntimeConfig, ContextError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = with_workspace_files(builder, workspace_root);
        let builder = environment::add_to_builder(builder);

        let config: RuntimeConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single file on top of the defaults
    pub fn load_from_file(path: &Path) -> Result<RuntimeConfig, ContextError> {
        let config: RuntimeConfig = merge_policy::builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Path of the global configuration file, when a home directory is known
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}

// Workspace files are optional; a missing one is skipped
fn with_workspace_files(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> ConfigBuilder<DefaultState> {
    let dir = workspace_root.join("config");
    let env_name = std::env::var(ENV_NAME_VAR)
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "development".to_string());

    ["config".to_string(), env_name]
        .iter()
        .map(|stem| dir.join(format!("{}.toml", stem)))
        .fold(builder, |builder, path| {
            builder.add_source(File::from(path).required(false))
        })
}
