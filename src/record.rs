//! Record model
//!
//! Records are serde types keyed by a separate key type. The key type names the table a
//! record lives in; several record types may share a table when one is a declared subtype
//! of another. Backends never see typed records, only [`StoredRecord`] rows.

use crate::error::ContextError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Separator between primary key fields in the key string
pub const KEY_SEPARATOR: char = ';';

/// Key of a stored record
pub trait RecordKey: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Table shared by every record type keyed by this type
    const TABLE: &'static str;

    /// Primary key fields in order, joined with [`KEY_SEPARATOR`] to form the row key
    fn key_fields(&self) -> Vec<String>;

    fn to_key_string(&self) -> String {
        self.key_fields().join(&KEY_SEPARATOR.to_string())
    }
}

/// A persisted record
pub trait Record: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    type Key: RecordKey;

    const TYPE_NAME: &'static str;

    /// Declared ancestors, nearest first. Loading any of them returns this record too.
    const BASE_TYPES: &'static [&'static str] = &[];

    fn key(&self) -> Self::Key;

    /// This type followed by its declared ancestors
    fn lineage() -> Vec<String> {
        std::iter::once(Self::TYPE_NAME)
            .chain(Self::BASE_TYPES.iter().copied())
            .map(str::to_string)
            .collect()
    }
}

/// Either a loaded record or a key still to be looked up
#[derive(Debug, Clone)]
pub enum RecordOrKey<R: Record> {
    Record(R),
    Key(R::Key),
}

/// Type-erased row exchanged with storage backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub table: String,
    pub key: String,
    pub type_name: String,
    pub lineage: Vec<String>,
    pub payload: serde_json::Value,
}

impl StoredRecord {
    pub fn from_record<R: Record>(record: &R) -> Result<Self, ContextError> {
        Ok(Self {
            table: R::Key::TABLE.to_string(),
            key: record.key().to_key_string(),
            type_name: R::TYPE_NAME.to_string(),
            lineage: R::lineage(),
            payload: serde_json::to_value(record)?,
        })
    }

    /// True when this row is `type_name` or one of its declared subtypes
    pub fn is_a(&self, type_name: &str) -> bool {
        self.lineage.iter().any(|t| t == type_name)
    }

    /// Deserialize into `R`, rejecting rows that are neither `R` nor its subtype
    pub fn into_record<R: Record>(self) -> Result<R, ContextError> {
        if !self.is_a(R::TYPE_NAME) {
            return Err(ContextError::RecordType {
                expected: R::TYPE_NAME.to_string(),
                actual: self.type_name,
            });
        }
        Ok(serde_json::from_value(self.payload)?)
    }

    /// True when every non-null field of `filter` equals the stored field
    pub fn matches(&self, filter: &serde_json::Map<String, serde_json::Value>) -> bool {
        filter.iter().all(|(field, expected)| {
            expected.is_null() || self.payload.get(field) == Some(expected)
        })
    }
}
