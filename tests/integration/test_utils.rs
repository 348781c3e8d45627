//! Shared test utilities for integration tests
//!
//! Record types used across the suites, root context helpers, and serialized access to
//! the process environment for configuration tests.

use ctxrt::config::ContextSettings;
use ctxrt::context::stack;
use ctxrt::db::MemoryDb;
use ctxrt::log::TracingLog;
use ctxrt::user::UserKey;
use ctxrt::{Context, Record, RecordKey};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const ENV_VARS: &[&str] = &[
    "HOME",
    "XDG_CONFIG_HOME",
    "CTXRT_ENV",
    "CTXRT__CONTEXT__DB_CLASS",
    "CTXRT__CONTEXT__DB_TEMP_PREFIX",
    "CTXRT__CONTEXT__CONTEXT_ID",
];

/// Environment variable state to restore after test
struct EnvState(Vec<(&'static str, Option<String>)>);

impl EnvState {
    fn capture() -> Self {
        Self(
            ENV_VARS
                .iter()
                .map(|name| (*name, std::env::var(name).ok()))
                .collect(),
        )
    }

    fn restore(self) {
        for (name, value) in self.0 {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir` and every `CTXRT_`
/// variable cleared, restoring the environment afterwards
pub fn with_config_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // Settle the process-wide settings before the environment changes underneath them
    let _ = ContextSettings::instance();
    let env_state = EnvState::capture();

    let test_home = test_dir.path().join("home");
    let test_config_home = test_dir.path().join("xdg");
    std::fs::create_dir_all(&test_home).unwrap();
    std::fs::create_dir_all(&test_config_home).unwrap();

    for name in ENV_VARS {
        std::env::remove_var(name);
    }
    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", &test_config_home);

    let result = f();

    env_state.restore();
    result
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionKey {
    pub position_id: String,
}

impl PositionKey {
    pub fn new(position_id: &str) -> Self {
        Self {
            position_id: position_id.to_string(),
        }
    }
}

impl RecordKey for PositionKey {
    const TABLE: &'static str = "Position";

    fn key_fields(&self) -> Vec<String> {
        vec![self.position_id.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: String,
    pub book: Option<String>,
    pub quantity: Option<i64>,
}

impl Position {
    pub fn new(position_id: &str, book: &str, quantity: i64) -> Self {
        Self {
            position_id: position_id.to_string(),
            book: Some(book.to_string()),
            quantity: Some(quantity),
        }
    }
}

impl Record for Position {
    type Key = PositionKey;
    const TYPE_NAME: &'static str = "Position";

    fn key(&self) -> PositionKey {
        PositionKey::new(&self.position_id)
    }
}

/// Subtype of [`Position`] sharing its table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxPosition {
    pub position_id: String,
    pub book: Option<String>,
    pub quantity: Option<i64>,
    pub currency: String,
}

impl Record for FxPosition {
    type Key = PositionKey;
    const TYPE_NAME: &'static str = "FxPosition";
    const BASE_TYPES: &'static [&'static str] = &["Position"];

    fn key(&self) -> PositionKey {
        PositionKey::new(&self.position_id)
    }
}

/// Root context over a fresh in-memory temporary database
pub fn memory_root(name: &str, dataset: &str) -> Context {
    Context::builder()
        .context_id(name)
        .user(UserKey::new(name))
        .log(Arc::new(TracingLog::new(name)))
        .db(Arc::new(MemoryDb::with_temp_prefix(
            format!("temp;{}", name),
            "temp;",
        )))
        .dataset(dataset)
        .build()
        .unwrap()
}

/// Run `f` inside an isolated stack with `name`'s memory root entered
pub fn in_root<F, R>(name: &str, dataset: &str, f: F) -> R
where
    F: FnOnce(&Context) -> R,
{
    stack::isolated(|| {
        let root = memory_root(name, dataset);
        let guard = root.enter().unwrap();
        let result = f(&root);
        guard.exit(Ok::<_, ctxrt::ContextError>(())).unwrap();
        result
    })
}
