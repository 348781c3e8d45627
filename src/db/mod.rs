//! Persistence Gateway
//!
//! [`Db`] is the contract a storage backend implements. It works on type-erased
//! [`StoredRecord`] rows within a resolved [`Scope`]. The typed operations callers use
//! (`load_one`, `save_many`, ...) are provided once for every backend by [`DbExt`].

pub mod gateway;
pub mod memory;
pub mod persistence;

pub use gateway::{DbExt, DbScope, LoadOptions};
pub use memory::MemoryDb;
pub use persistence::SledDb;

use crate::config::ContextSettings;
use crate::error::ContextError;
use crate::record::{Record, RecordKey, StoredRecord};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

impl std::fmt::Debug for dyn Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").field("db_id", &self.db_id()).finish()
    }
}

/// Dataset and identity a backend call runs under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Normalized dataset, see [`crate::dataset`]
    pub dataset: String,
    /// Opaque identity token for access control decisions
    pub identity: Option<String>,
}

/// Storage backend contract
///
/// Implementations must be safe to share between threads and are responsible for their
/// own per-row atomicity. Saving an existing key overwrites it; removing a missing key
/// is not an error.
pub trait Db: Send + Sync {
    fn db_id(&self) -> &str;

    fn db_key(&self) -> DbKey {
        DbKey::new(self.db_id())
    }

    fn get(
        &self,
        table: &str,
        key: &str,
        scope: &Scope,
    ) -> Result<Option<StoredRecord>, ContextError>;

    /// Look up several keys; the result has the same length and order as `keys`
    fn get_many(
        &self,
        table: &str,
        keys: &[String],
        scope: &Scope,
    ) -> Result<Vec<Option<StoredRecord>>, ContextError> {
        keys.iter().map(|key| self.get(table, key, scope)).collect()
    }

    /// All rows of a table within the dataset, in key order
    fn scan(&self, table: &str, scope: &Scope) -> Result<Vec<StoredRecord>, ContextError>;

    fn put(&self, record: StoredRecord, scope: &Scope) -> Result<(), ContextError>;

    fn put_many(&self, records: Vec<StoredRecord>, scope: &Scope) -> Result<(), ContextError> {
        for record in records {
            self.put(record, scope)?;
        }
        Ok(())
    }

    fn remove(&self, table: &str, key: &str, scope: &Scope) -> Result<(), ContextError>;

    fn remove_many(&self, table: &str, keys: &[String], scope: &Scope) -> Result<(), ContextError> {
        for key in keys {
            self.remove(table, key, scope)?;
        }
        Ok(())
    }

    /// Permanently delete every record.
    ///
    /// Implementations must call [`error_if_not_temp_db`] themselves before deleting.
    fn delete_all_and_drop_db(&self) -> Result<(), ContextError>;

    /// Release connections and file locks
    fn close_connection(&self) -> Result<(), ContextError> {
        Ok(())
    }
}

/// Fail with a permission error unless `db_id` starts with `temp_prefix`
pub fn error_if_not_temp_db(db_id: &str, temp_prefix: &str) -> Result<(), ContextError> {
    if temp_prefix.is_empty() || !db_id.starts_with(temp_prefix) {
        return Err(ContextError::Permission(format!(
            "Destructive action on database '{}' is not permitted because it does not start \
             with the temporary database prefix '{}'",
            db_id, temp_prefix
        )));
    }
    Ok(())
}

/// Backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbClass {
    #[default]
    Memory,
    Sled,
}

/// Reference to a database by identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DbKey {
    pub db_id: String,
}

impl DbKey {
    pub fn new(db_id: impl Into<String>) -> Self {
        Self {
            db_id: db_id.into(),
        }
    }
}

impl RecordKey for DbKey {
    const TABLE: &'static str = "Db";

    fn key_fields(&self) -> Vec<String> {
        vec![self.db_id.clone()]
    }
}

/// Stored description of a database, used to open it from a [`DbKey`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbSpec {
    pub db_id: String,
    pub db_class: DbClass,
    /// Directory for file-backed classes
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Record for DbSpec {
    type Key = DbKey;
    const TYPE_NAME: &'static str = "DbSpec";

    fn key(&self) -> DbKey {
        DbKey::new(&self.db_id)
    }
}

impl DbSpec {
    /// Spec for `db_id` placed under the configured database directory
    pub fn from_settings(db_id: &str, db_class: DbClass, settings: &ContextSettings) -> Self {
        let path = match db_class {
            DbClass::Memory => None,
            DbClass::Sled => Some(settings.db_dir.join(sanitize_db_id(db_id))),
        };
        Self {
            db_id: db_id.to_string(),
            db_class,
            path,
        }
    }

    pub fn open(&self, temp_prefix: &str) -> Result<Arc<dyn Db>, ContextError> {
        match self.db_class {
            DbClass::Memory => Ok(Arc::new(MemoryDb::with_temp_prefix(&self.db_id, temp_prefix))),
            DbClass::Sled => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ContextError::Config(format!(
                        "Database '{}' of class 'sled' has no path",
                        self.db_id
                    ))
                })?;
                Ok(Arc::new(SledDb::open(&self.db_id, path, temp_prefix)?))
            }
        }
    }
}

// Identifiers such as `temp;module;test` become directory names
fn sanitize_db_id(db_id: &str) -> String {
    db_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
