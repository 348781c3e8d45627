//! Serializable context snapshots
//!
//! A snapshot records the keys a context was built from so it can be handed to another
//! worker. A context rebuilt from a snapshot is marked deserialized and its keys are
//! never resolved.

use crate::config::ContextSettings;
use crate::context::{Context, ContextInner, ContextKind, ContextState, Reference};
use crate::db::DbKey;
use crate::log::LogKey;
use crate::record::{Record, RecordKey};
use crate::user::UserKey;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextKey {
    pub context_id: String,
}

impl RecordKey for ContextKey {
    const TABLE: &'static str = "Context";

    fn key_fields(&self) -> Vec<String> {
        vec![self.context_id.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub context_id: String,
    pub user: UserKey,
    pub log: LogKey,
    pub db: DbKey,
    pub dataset: String,
}

impl Record for ContextSnapshot {
    type Key = ContextKey;
    const TYPE_NAME: &'static str = "Context";

    fn key(&self) -> ContextKey {
        ContextKey {
            context_id: self.context_id.clone(),
        }
    }
}

impl Context {
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            context_id: self.context_id().to_string(),
            user: self.user().clone(),
            log: self.log_key(),
            db: self.db_key(),
            dataset: self.dataset().to_string(),
        }
    }

    /// Rebuild a context without inheritance or resolution
    pub fn from_snapshot(snapshot: ContextSnapshot) -> Context {
        Context::from_inner(ContextInner {
            context_id: snapshot.context_id,
            user: snapshot.user,
            log: Reference::Key(snapshot.log),
            db: Reference::Key(snapshot.db),
            dataset: snapshot.dataset,
            temp_prefix: ContextSettings::instance().db_temp_prefix.clone(),
            is_deserialized: true,
            kind: ContextKind::Plain,
            state: Mutex::new(ContextState::Unentered),
        })
    }
}
