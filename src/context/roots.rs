//! Root contexts for a process and for a test

use crate::config::ContextSettings;
use crate::context::{Context, ContextBuilder};
use crate::dataset;
use crate::db::{DbClass, DbSpec};
use crate::error::ContextError;
use crate::log::LogSpec;
use crate::ordered_id;
use crate::user::UserKey;
use std::sync::OnceLock;

static PROCESS_ID: OnceLock<String> = OnceLock::new();

/// Identifier of this process, stable for its lifetime.
///
/// The readable form of an ordered id with separators that are awkward in file and
/// database names removed: `2024-05-01-10-20-30-123-<hex>`.
pub fn process_id() -> &'static str {
    PROCESS_ID.get_or_init(|| {
        ordered_id::create_one()
            .to_readable_string()
            .replace([':', '.', 'T'], "-")
            .replace('Z', "")
    })
}

/// Name of the OS user running the process
pub fn os_user_name() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Database identifier of a test context: the temp prefix followed by the test name
pub fn testing_db_id(name: &str, temp_prefix: &str) -> String {
    format!("{}{}", temp_prefix, name.replace('.', ";"))
}

impl Context {
    /// Root context of the process, configured from the process-wide settings
    pub fn process() -> Result<Context, ContextError> {
        Self::process_with(ContextSettings::instance())
    }

    pub fn process_with(settings: &ContextSettings) -> Result<Context, ContextError> {
        let context_id = settings
            .context_id
            .clone()
            .unwrap_or_else(|| process_id().to_string());

        let log = LogSpec::new(&context_id, settings.log_class).open();
        let db = DbSpec::from_settings(&context_id, settings.db_class, settings)
            .open(&settings.db_temp_prefix)?;

        ContextBuilder::new()
            .context_id(context_id)
            .user(UserKey::new(os_user_name()))
            .log(log)
            .db(db)
            .dataset(dataset::root())
            .temp_prefix(&settings.db_temp_prefix)
            .build()
    }

    /// Root context for one test.
    ///
    /// `name` is usually `module::path.test_name`. The context owns a temporary database
    /// that is emptied when the context is entered and again when it exits.
    pub fn testing(name: &str) -> Result<Context, ContextError> {
        let settings = ContextSettings::instance();
        Self::testing_with(name, settings.db_class, settings)
    }

    pub fn testing_with(
        name: &str,
        db_class: DbClass,
        settings: &ContextSettings,
    ) -> Result<Context, ContextError> {
        let db_id = testing_db_id(name, &settings.db_temp_prefix);
        let log = LogSpec::new(name, settings.log_class).open();
        let db = DbSpec::from_settings(&db_id, db_class, settings).open(&settings.db_temp_prefix)?;

        ContextBuilder::new()
            .context_id(name)
            .user(UserKey::new(name))
            .log(log)
            .db(db)
            .dataset(dataset::root())
            .temp_prefix(&settings.db_temp_prefix)
            .testing()
            .build()
    }
}
