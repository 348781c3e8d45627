//! Sled-backed persistence

use crate::db::{error_if_not_temp_db, Db, Scope};
use crate::error::{ContextError, StorageError};
use crate::record::StoredRecord;
use std::path::Path;
use tracing::debug;

/// Prefix of every tree holding a record table
const TABLE_TREE_PREFIX: &str = "table:";

/// Sled-based implementation of [`Db`]
///
/// Each table lives in its own tree. Row keys are the dataset followed by a NUL byte
/// and the record key, so a prefix scan returns one dataset in key order.
pub struct SledDb {
    db_id: String,
    temp_prefix: String,
    db: sled::Db,
}

impl SledDb {
    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(
        db_id: &str,
        path: P,
        temp_prefix: &str,
    ) -> Result<Self, ContextError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!(
                    "Failed to open sled database '{}' at {}: {}",
                    db_id,
                    path.as_ref().display(),
                    e
                ),
            ))
        })?;
        debug!(db_id, path = %path.as_ref().display(), "Opened sled database");
        Ok(Self {
            db_id: db_id.to_string(),
            temp_prefix: temp_prefix.to_string(),
            db,
        })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), ContextError> {
        self.db.flush()?;
        Ok(())
    }

    fn table(&self, table: &str) -> Result<sled::Tree, ContextError> {
        Ok(self.db.open_tree(format!("{}{}", TABLE_TREE_PREFIX, table))?)
    }
}

fn dataset_prefix(scope: &Scope) -> Vec<u8> {
    let mut prefix = scope.dataset.as_bytes().to_vec();
    prefix.push(0);
    prefix
}

fn row_key(scope: &Scope, key: &str) -> Vec<u8> {
    let mut row = dataset_prefix(scope);
    row.extend_from_slice(key.as_bytes());
    row
}

fn decode(value: &[u8]) -> Result<StoredRecord, ContextError> {
    Ok(serde_json::from_slice(value)?)
}

impl Db for SledDb {
    fn db_id(&self) -> &str {
        &self.db_id
    }

    fn get(
        &self,
        table: &str,
        key: &str,
        scope: &Scope,
    ) -> Result<Option<StoredRecord>, ContextError> {
        match self.table(table)?.get(row_key(scope, key))? {
            Some(value) => decode(&value).map(Some),
            None => Ok(None),
        }
    }

    fn get_many(
        &self,
        table: &str,
        keys: &[String],
        scope: &Scope,
    ) -> Result<Vec<Option<StoredRecord>>, ContextError> {
        let tree = self.table(table)?;
        keys.iter()
            .map(|key| match tree.get(row_key(scope, key))? {
                Some(value) => decode(&value).map(Some),
                None => Ok(None),
            })
            .collect()
    }

    fn scan(&self, table: &str, scope: &Scope) -> Result<Vec<StoredRecord>, ContextError> {
        let mut records = Vec::new();
        for item in self.table(table)?.scan_prefix(dataset_prefix(scope)) {
            let (_, value) = item?;
            records.push(decode(&value)?);
        }
        Ok(records)
    }

    fn put(&self, record: StoredRecord, scope: &Scope) -> Result<(), ContextError> {
        let value = serde_json::to_vec(&record)?;
        self.table(&record.table)?
            .insert(row_key(scope, &record.key), value)?;
        Ok(())
    }

    /// Rows of one table are written in a single atomic batch
    fn put_many(&self, records: Vec<StoredRecord>, scope: &Scope) -> Result<(), ContextError> {
        let mut batches: Vec<(String, sled::Batch)> = Vec::new();
        for record in records {
            let value = serde_json::to_vec(&record)?;
            let position = match batches.iter().position(|(table, _)| *table == record.table) {
                Some(position) => position,
                None => {
                    batches.push((record.table.clone(), sled::Batch::default()));
                    batches.len() - 1
                }
            };
            batches[position].1.insert(row_key(scope, &record.key), value);
        }

        for (table, batch) in batches {
            self.table(&table)?.apply_batch(batch)?;
        }
        Ok(())
    }

    fn remove(&self, table: &str, key: &str, scope: &Scope) -> Result<(), ContextError> {
        self.table(table)?.remove(row_key(scope, key))?;
        Ok(())
    }

    fn remove_many(&self, table: &str, keys: &[String], scope: &Scope) -> Result<(), ContextError> {
        let mut batch = sled::Batch::default();
        for key in keys {
            batch.remove(row_key(scope, key));
        }
        self.table(table)?.apply_batch(batch)?;
        Ok(())
    }

    fn delete_all_and_drop_db(&self) -> Result<(), ContextError> {
        error_if_not_temp_db(&self.db_id, &self.temp_prefix)?;

        let prefix = TABLE_TREE_PREFIX.as_bytes();
        for name in self.db.tree_names() {
            if name.starts_with(prefix) {
                self.db.drop_tree(&name)?;
            }
        }
        self.db.flush()?;
        debug!(db_id = %self.db_id, "Dropped all tables");
        Ok(())
    }

    fn close_connection(&self) -> Result<(), ContextError> {
        self.flush()
    }
}
