use crate::config::ContextSettings;
use crate::context::{stack, Context, ContextInner, ContextKind, ContextState, DbRef, LogRef, Reference};
use crate::dataset;
use crate::db::{Db, DbExt, DbKey, DbSpec, LoadOptions};
use crate::error::ContextError;
use crate::log::{Log, LogKey, LogSpec};
use crate::ordered_id;
use crate::record::RecordOrKey;
use crate::user::UserKey;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Builds a [`Context`], inheriting unset fields from the current context.
///
/// Inheritance and reference resolution run once, in [`ContextBuilder::build`].
#[derive(Default)]
pub struct ContextBuilder {
    context_id: Option<String>,
    user: Option<UserKey>,
    log: Option<LogRef>,
    db: Option<DbRef>,
    dataset: Option<String>,
    temp_prefix: Option<String>,
    kind: ContextKind,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn user(mut self, user: UserKey) -> Self {
        self.user = Some(user);
        self
    }

    pub fn log(mut self, log: Arc<dyn Log>) -> Self {
        self.log = Some(Reference::Handle(log));
        self
    }

    /// Log sink to load from the new context's database
    pub fn log_key(mut self, key: LogKey) -> Self {
        self.log = Some(Reference::Key(key));
        self
    }

    pub fn db(mut self, db: Arc<dyn Db>) -> Self {
        self.db = Some(Reference::Handle(db));
        self
    }

    /// Database to load from the enclosing context's database
    pub fn db_key(mut self, key: DbKey) -> Self {
        self.db = Some(Reference::Key(key));
        self
    }

    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    /// Prefix marking databases this context may drop; inherited like the other fields
    /// and taken from the process settings for a root context
    pub fn temp_prefix(mut self, temp_prefix: impl Into<String>) -> Self {
        self.temp_prefix = Some(temp_prefix.into());
        self
    }

    pub(crate) fn testing(mut self) -> Self {
        self.kind = ContextKind::Testing;
        self
    }

    /// Fill unset fields from the current context, then resolve keys into handles.
    ///
    /// Without a current context every field except `context_id` must be set; the error
    /// names the first missing one. Blank values are rejected the same way.
    pub fn build(self) -> Result<Context, ContextError> {
        let parent = stack::try_current()?;

        let context_id = self
            .context_id
            .unwrap_or_else(|| ordered_id::create_one().to_readable_string());
        require_non_blank("context_id", &context_id)?;
        let user = inherit("user", self.user, parent.as_ref(), |p| p.user().clone())?;
        require_non_blank("user", &user.username)?;
        let log = inherit("log", self.log, parent.as_ref(), |p| p.log_ref().clone())?;
        let db = inherit("db", self.db, parent.as_ref(), |p| p.db_ref().clone())?;
        let dataset = inherit("dataset", self.dataset, parent.as_ref(), |p| {
            p.dataset().to_string()
        })?;
        require_non_blank("dataset", &dataset)?;
        dataset::normalize(&dataset)?;
        let temp_prefix = match (self.temp_prefix, parent.as_ref()) {
            (Some(prefix), _) => prefix,
            (None, Some(parent)) => parent.temp_prefix().to_string(),
            (None, None) => ContextSettings::instance().db_temp_prefix.clone(),
        };

        let db = resolve_db(db, parent.as_ref(), &temp_prefix)?;
        let log = resolve_log(log, &db)?;
        if let Reference::Handle(db) = &db {
            require_non_blank("db", db.db_id())?;
        }
        if let Reference::Handle(log) = &log {
            require_non_blank("log", log.log_id())?;
        }

        debug!(
            context_id = %context_id,
            user = %user,
            dataset = %dataset,
            inherited = parent.is_some(),
            "Built context"
        );
        Ok(Context::from_inner(ContextInner {
            context_id,
            user,
            log,
            db,
            dataset,
            temp_prefix,
            is_deserialized: false,
            kind: self.kind,
            state: Mutex::new(ContextState::Unentered),
        }))
    }
}

fn inherit<T>(
    field: &str,
    value: Option<T>,
    parent: Option<&Context>,
    from_parent: impl FnOnce(&Context) -> T,
) -> Result<T, ContextError> {
    match (value, parent) {
        (Some(value), _) => Ok(value),
        (None, Some(parent)) => Ok(from_parent(parent)),
        (None, None) => Err(ContextError::Config(format!(
            "Field '{}' is not set and there is no active context to inherit it from; \
             a root context must set it explicitly",
            field
        ))),
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<(), ContextError> {
    if value.trim().is_empty() {
        return Err(ContextError::Config(format!(
            "Field '{}' must not be empty",
            field
        )));
    }
    Ok(())
}

// A database key is looked up in the enclosing context's database
fn resolve_db(
    db: DbRef,
    parent: Option<&Context>,
    temp_prefix: &str,
) -> Result<DbRef, ContextError> {
    let key = match db {
        Reference::Handle(_) => return Ok(db),
        Reference::Key(key) => key,
    };
    let parent_db = parent.map(Context::db).transpose()?.ok_or_else(|| {
        ContextError::Config(format!(
            "Database key '{}' cannot be resolved without an active context",
            key.db_id
        ))
    })?;

    let spec = parent_db
        .load_one::<DbSpec>(RecordOrKey::Key(key), &LoadOptions::new())?
        .ok_or_else(|| ContextError::NotFound("Database spec".to_string()))?;
    debug!(db_id = %spec.db_id, db_class = ?spec.db_class, "Resolved database key");
    Ok(Reference::Handle(spec.open(temp_prefix)?))
}

// A log key is looked up in the new context's own database
fn resolve_log(log: LogRef, db: &DbRef) -> Result<LogRef, ContextError> {
    let key = match log {
        Reference::Handle(_) => return Ok(log),
        Reference::Key(key) => key,
    };
    let db = db.handle().ok_or_else(|| {
        ContextError::Config(format!(
            "Log key '{}' cannot be resolved without a database",
            key.log_id
        ))
    })?;

    let spec = db
        .load_one::<LogSpec>(RecordOrKey::Key(key), &LoadOptions::new())?
        .ok_or_else(|| ContextError::NotFound("Log spec".to_string()))?;
    debug!(log_id = %spec.log_id, "Resolved log key");
    Ok(Reference::Handle(spec.open()))
}
