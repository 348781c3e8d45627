//! Execution Context
//!
//! A [`Context`] carries the user, log sink, database and dataset of a unit of work.
//! Contexts nest: entering one pushes it onto the calling logical thread's stack (see
//! [`stack`]), and [`Context::current`] returns the innermost one. Fields left unset when
//! building a context are inherited from the current context, once, at build time; after
//! that a context is read-only.
//!
//! Persistence calls made through a context are forwarded to its database with the
//! context dataset prepended to any dataset override.

mod builder;
pub mod roots;
mod scope;
pub mod snapshot;
pub mod stack;

pub use builder::ContextBuilder;
pub use scope::{ContextGuard, ScopeFailure};
pub use snapshot::{ContextKey, ContextSnapshot};

use crate::dataset;
use crate::db::{self, Db, DbExt, DbKey, DbScope, LoadOptions};
use crate::error::ContextError;
use crate::log::{Log, LogKey, Logger};
use crate::record::{Record, RecordKey, RecordOrKey};
use crate::user::UserKey;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A field given either as a key to resolve or as a live handle
#[derive(Clone)]
pub enum Reference<K, H> {
    Key(K),
    Handle(H),
}

impl<K, H> Reference<K, H> {
    pub fn handle(&self) -> Option<&H> {
        match self {
            Reference::Handle(handle) => Some(handle),
            Reference::Key(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Handle(_))
    }
}

pub type DbRef = Reference<DbKey, Arc<dyn Db>>;
pub type LogRef = Reference<LogKey, Arc<dyn Log>>;

/// Lifecycle of a context instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Unentered,
    Active,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ContextKind {
    #[default]
    Plain,
    /// Drops its temporary database on enter and on exit
    Testing,
}

pub(crate) struct ContextInner {
    context_id: String,
    user: UserKey,
    log: LogRef,
    db: DbRef,
    dataset: String,
    /// Prefix a database id needs before it may be dropped
    temp_prefix: String,
    is_deserialized: bool,
    kind: ContextKind,
    state: Mutex<ContextState>,
}

/// Shared handle to an execution context
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// Innermost active context of the calling logical thread
    pub fn current() -> Result<Context, ContextError> {
        stack::current()
    }

    pub(crate) fn from_inner(inner: ContextInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn context_id(&self) -> &str {
        &self.inner.context_id
    }

    pub fn user(&self) -> &UserKey {
        &self.inner.user
    }

    /// Dataset as given when the context was built
    pub fn dataset(&self) -> &str {
        &self.inner.dataset
    }

    /// True for contexts rebuilt from a snapshot; their references are never resolved
    pub fn is_deserialized(&self) -> bool {
        self.inner.is_deserialized
    }

    /// Temp database prefix this context was built with
    pub fn temp_prefix(&self) -> &str {
        &self.inner.temp_prefix
    }

    pub fn state(&self) -> ContextState {
        *self.inner.state.lock()
    }

    /// True when both handles point at the same context instance
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn kind(&self) -> ContextKind {
        self.inner.kind
    }

    pub(crate) fn db_ref(&self) -> &DbRef {
        &self.inner.db
    }

    pub(crate) fn log_ref(&self) -> &LogRef {
        &self.inner.log
    }

    pub fn db(&self) -> Result<Arc<dyn Db>, ContextError> {
        match &self.inner.db {
            Reference::Handle(db) => Ok(Arc::clone(db)),
            Reference::Key(key) => Err(ContextError::Config(format!(
                "Database '{}' of context '{}' is not resolved",
                key.db_id, self.inner.context_id
            ))),
        }
    }

    pub fn db_key(&self) -> DbKey {
        match &self.inner.db {
            Reference::Handle(db) => db.db_key(),
            Reference::Key(key) => key.clone(),
        }
    }

    pub fn log(&self) -> Result<Arc<dyn Log>, ContextError> {
        match &self.inner.log {
            Reference::Handle(log) => Ok(Arc::clone(log)),
            Reference::Key(key) => Err(ContextError::Config(format!(
                "Log '{}' of context '{}' is not resolved",
                key.log_id, self.inner.context_id
            ))),
        }
    }

    pub fn log_key(&self) -> LogKey {
        match &self.inner.log {
            Reference::Handle(log) => log.log_key(),
            Reference::Key(key) => key.clone(),
        }
    }

    pub fn get_logger(&self, name: &str) -> Result<Logger, ContextError> {
        Ok(self.log()?.get_logger(name))
    }

    /// Scope of a delegated call: the context dataset followed by the override
    fn effective_scope(&self, scope: &DbScope) -> Result<DbScope, ContextError> {
        let dataset = match &scope.dataset {
            Some(over) => dataset::combine(&[self.inner.dataset.as_str(), over.as_str()])?,
            None => dataset::normalize(&self.inner.dataset)?,
        };
        Ok(DbScope {
            dataset: Some(dataset),
            identity: scope.identity.clone(),
        })
    }

    /// Load one record; a record passed in is returned without touching the database
    pub fn load_one<R: Record>(
        &self,
        record_or_key: impl Into<Option<RecordOrKey<R>>>,
        options: &LoadOptions,
    ) -> Result<Option<R>, ContextError> {
        let record_or_key = record_or_key.into();
        if let Some(RecordOrKey::Record(record)) = record_or_key {
            return Ok(Some(record));
        }
        let options = LoadOptions {
            scope: self.effective_scope(&options.scope)?,
            ..options.clone()
        };
        self.db()?.load_one(record_or_key, &options)
    }

    pub fn load_many<R: Record>(
        &self,
        records_or_keys: impl IntoIterator<Item = Option<RecordOrKey<R>>>,
        scope: &DbScope,
    ) -> Result<Vec<Option<R>>, ContextError> {
        self.db()?
            .load_many(records_or_keys, &self.effective_scope(scope)?)
    }

    pub fn load_all<R: Record>(&self, scope: &DbScope) -> Result<Vec<R>, ContextError> {
        self.db()?.load_all(&self.effective_scope(scope)?)
    }

    pub fn load_filter<R: Record, F: Serialize + ?Sized>(
        &self,
        filter: &F,
        scope: &DbScope,
    ) -> Result<Vec<R>, ContextError> {
        self.db()?.load_filter(filter, &self.effective_scope(scope)?)
    }

    pub fn save_one<R: Record>(&self, record: &R, scope: &DbScope) -> Result<(), ContextError> {
        self.db()?.save_one(record, &self.effective_scope(scope)?)
    }

    pub fn save_many<R: Record>(&self, records: &[R], scope: &DbScope) -> Result<(), ContextError> {
        self.db()?.save_many(records, &self.effective_scope(scope)?)
    }

    pub fn delete_one<K: RecordKey>(&self, key: &K, scope: &DbScope) -> Result<(), ContextError> {
        self.db()?.delete_one(key, &self.effective_scope(scope)?)
    }

    pub fn delete_many<K: RecordKey>(&self, keys: &[K], scope: &DbScope) -> Result<(), ContextError> {
        self.db()?.delete_many(keys, &self.effective_scope(scope)?)
    }

    /// Fail unless the context database is a temporary one
    pub fn error_if_not_temp_db(&self) -> Result<(), ContextError> {
        db::error_if_not_temp_db(&self.db_key().db_id, &self.inner.temp_prefix)
    }

    /// Irreversibly delete every record of the context database
    pub fn delete_all_and_drop_db(&self) -> Result<(), ContextError> {
        let db = self.db()?;
        db::error_if_not_temp_db(db.db_id(), &self.inner.temp_prefix)?;
        db.delete_all_and_drop_db()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("context_id", &self.inner.context_id)
            .field("user", &self.inner.user.username)
            .field("log", &self.log_key().log_id)
            .field("db", &self.db_key().db_id)
            .field("dataset", &self.inner.dataset)
            .field("is_deserialized", &self.inner.is_deserialized)
            .field("state", &self.state())
            .finish()
    }
}
