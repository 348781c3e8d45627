//! In-memory backend

use crate::db::{error_if_not_temp_db, Db, Scope};
use crate::error::ContextError;
use crate::record::StoredRecord;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

type Table = BTreeMap<String, StoredRecord>;

/// Backend holding every row in process memory
///
/// Rows are grouped by dataset, then by table; keys within a table are kept sorted.
pub struct MemoryDb {
    db_id: String,
    temp_prefix: String,
    datasets: RwLock<HashMap<String, HashMap<String, Table>>>,
}

impl MemoryDb {
    pub fn with_temp_prefix(db_id: impl Into<String>, temp_prefix: impl Into<String>) -> Self {
        Self {
            db_id: db_id.into(),
            temp_prefix: temp_prefix.into(),
            datasets: RwLock::new(HashMap::new()),
        }
    }

    /// Number of rows across every dataset and table
    pub fn len(&self) -> usize {
        self.datasets
            .read()
            .values()
            .flat_map(|tables| tables.values())
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Db for MemoryDb {
    fn db_id(&self) -> &str {
        &self.db_id
    }

    fn get(
        &self,
        table: &str,
        key: &str,
        scope: &Scope,
    ) -> Result<Option<StoredRecord>, ContextError> {
        let datasets = self.datasets.read();
        Ok(datasets
            .get(&scope.dataset)
            .and_then(|tables| tables.get(table))
            .and_then(|rows| rows.get(key))
            .cloned())
    }

    fn get_many(
        &self,
        table: &str,
        keys: &[String],
        scope: &Scope,
    ) -> Result<Vec<Option<StoredRecord>>, ContextError> {
        let datasets = self.datasets.read();
        let rows = datasets
            .get(&scope.dataset)
            .and_then(|tables| tables.get(table));
        Ok(keys
            .iter()
            .map(|key| rows.and_then(|rows| rows.get(key)).cloned())
            .collect())
    }

    fn scan(&self, table: &str, scope: &Scope) -> Result<Vec<StoredRecord>, ContextError> {
        let datasets = self.datasets.read();
        Ok(datasets
            .get(&scope.dataset)
            .and_then(|tables| tables.get(table))
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn put(&self, record: StoredRecord, scope: &Scope) -> Result<(), ContextError> {
        self.put_many(vec![record], scope)
    }

    fn put_many(&self, records: Vec<StoredRecord>, scope: &Scope) -> Result<(), ContextError> {
        let mut datasets = self.datasets.write();
        let tables = datasets.entry(scope.dataset.clone()).or_default();
        for record in records {
            tables
                .entry(record.table.clone())
                .or_default()
                .insert(record.key.clone(), record);
        }
        Ok(())
    }

    fn remove(&self, table: &str, key: &str, scope: &Scope) -> Result<(), ContextError> {
        let mut datasets = self.datasets.write();
        if let Some(rows) = datasets
            .get_mut(&scope.dataset)
            .and_then(|tables| tables.get_mut(table))
        {
            rows.remove(key);
        }
        Ok(())
    }

    fn delete_all_and_drop_db(&self) -> Result<(), ContextError> {
        error_if_not_temp_db(&self.db_id, &self.temp_prefix)?;
        self.datasets.write().clear();
        Ok(())
    }
}
