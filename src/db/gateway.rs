//! Typed persistence operations shared by every backend

use crate::dataset;
use crate::db::{Db, Scope};
use crate::error::ContextError;
use crate::record::{Record, RecordKey, RecordOrKey, StoredRecord};
use serde::Serialize;

/// Optional dataset and identity arguments of a persistence call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbScope {
    /// Dataset to use; root when not set
    pub dataset: Option<String>,
    /// Identity token passed to the backend
    pub identity: Option<String>,
}

impl DbScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Normalize the dataset for a backend call
    pub fn resolve(&self) -> Result<Scope, ContextError> {
        let dataset = match &self.dataset {
            Some(dataset) => dataset::normalize(dataset)?,
            None => dataset::root(),
        };
        Ok(Scope {
            dataset,
            identity: self.identity.clone(),
        })
    }
}

/// Arguments of `load_one`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub scope: DbScope,
    /// Return `None` instead of failing when no key is given
    pub allow_missing_key: bool,
    /// Return `None` instead of failing when no record exists for the key
    pub allow_missing_record: bool,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.scope.dataset = Some(dataset.into());
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.scope.identity = Some(identity.into());
        self
    }

    pub fn allow_missing_key(mut self) -> Self {
        self.allow_missing_key = true;
        self
    }

    pub fn allow_missing_record(mut self) -> Self {
        self.allow_missing_record = true;
        self
    }
}

/// Typed gateway over a [`Db`]
pub trait DbExt: Db {
    /// Load one record of type `R` or its declared subtype.
    ///
    /// A record passed in is returned as is, without a lookup.
    fn load_one<R: Record>(
        &self,
        record_or_key: impl Into<Option<RecordOrKey<R>>>,
        options: &LoadOptions,
    ) -> Result<Option<R>, ContextError> {
        let key = match record_or_key.into() {
            Some(RecordOrKey::Record(record)) => return Ok(Some(record)),
            Some(RecordOrKey::Key(key)) => key,
            None if options.allow_missing_key => return Ok(None),
            None => {
                return Err(ContextError::NotFound(format!(
                    "Key is not set when loading record type {}",
                    R::TYPE_NAME
                )))
            }
        };

        let scope = options.scope.resolve()?;
        let key_string = key.to_key_string();
        match self.get(R::Key::TABLE, &key_string, &scope)? {
            Some(row) => row.into_record().map(Some),
            None if options.allow_missing_record => Ok(None),
            None => Err(ContextError::NotFound(format!(
                "{} record is not found for key '{}' in dataset '{}'",
                R::TYPE_NAME,
                key_string,
                scope.dataset
            ))),
        }
    }

    /// Element-wise `load_one` where missing keys and missing records become `None`.
    ///
    /// The result has the same length and order as the input.
    fn load_many<R: Record>(
        &self,
        records_or_keys: impl IntoIterator<Item = Option<RecordOrKey<R>>>,
        scope: &DbScope,
    ) -> Result<Vec<Option<R>>, ContextError> {
        let items: Vec<Option<RecordOrKey<R>>> = records_or_keys.into_iter().collect();
        let lookups: Vec<String> = items
            .iter()
            .filter_map(|item| match item {
                Some(RecordOrKey::Key(key)) => Some(key.to_key_string()),
                _ => None,
            })
            .collect();

        let resolved = scope.resolve()?;
        let rows = if lookups.is_empty() {
            Vec::new()
        } else {
            self.get_many(R::Key::TABLE, &lookups, &resolved)?
        };
        if rows.len() != lookups.len() {
            return Err(ContextError::Consistency(format!(
                "Backend returned {} rows for {} keys of table {}",
                rows.len(),
                lookups.len(),
                R::Key::TABLE
            )));
        }

        let mut rows = rows.into_iter();
        items
            .into_iter()
            .map(|item| match item {
                None => Ok(None),
                Some(RecordOrKey::Record(record)) => Ok(Some(record)),
                Some(RecordOrKey::Key(_)) => match rows.next().flatten() {
                    Some(row) => row.into_record().map(Some),
                    None => Ok(None),
                },
            })
            .collect()
    }

    /// All records of type `R` and its subtypes in the dataset
    fn load_all<R: Record>(&self, scope: &DbScope) -> Result<Vec<R>, ContextError> {
        let resolved = scope.resolve()?;
        self.scan(R::Key::TABLE, &resolved)?
            .into_iter()
            .filter(|row| row.is_a(R::TYPE_NAME))
            .map(StoredRecord::into_record)
            .collect()
    }

    /// Records whose stored fields equal every non-null field of `filter`
    fn load_filter<R: Record, F: Serialize + ?Sized>(
        &self,
        filter: &F,
        scope: &DbScope,
    ) -> Result<Vec<R>, ContextError> {
        let filter = match serde_json::to_value(filter)? {
            serde_json::Value::Object(fields) => fields,
            other => {
                return Err(ContextError::Config(format!(
                    "Filter for {} must serialize to an object, got {}",
                    R::TYPE_NAME,
                    other
                )))
            }
        };

        let resolved = scope.resolve()?;
        self.scan(R::Key::TABLE, &resolved)?
            .into_iter()
            .filter(|row| row.is_a(R::TYPE_NAME) && row.matches(&filter))
            .map(StoredRecord::into_record)
            .collect()
    }

    /// Insert or overwrite one record
    fn save_one<R: Record>(&self, record: &R, scope: &DbScope) -> Result<(), ContextError> {
        let row = StoredRecord::from_record(record)?;
        self.put(row, &scope.resolve()?)
    }

    fn save_many<R: Record>(&self, records: &[R], scope: &DbScope) -> Result<(), ContextError> {
        let rows = records
            .iter()
            .map(StoredRecord::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        self.put_many(rows, &scope.resolve()?)
    }

    /// Delete one record; a missing key is not an error
    fn delete_one<K: RecordKey>(&self, key: &K, scope: &DbScope) -> Result<(), ContextError> {
        self.remove(K::TABLE, &key.to_key_string(), &scope.resolve()?)
    }

    fn delete_many<K: RecordKey>(&self, keys: &[K], scope: &DbScope) -> Result<(), ContextError> {
        let keys: Vec<String> = keys.iter().map(RecordKey::to_key_string).collect();
        self.remove_many(K::TABLE, &keys, &scope.resolve()?)
    }
}

impl<T: Db + ?Sized> DbExt for T {}
