//! ctxrt: Scoped Execution Contexts
//!
//! Nested execution contexts carrying user, log sink, database and dataset, a storage
//! gateway reached through the current context, and strictly ordered identifiers for
//! record keys.

pub mod config;
pub mod context;
pub mod dataset;
pub mod db;
pub mod error;
pub mod log;
pub mod logging;
pub mod ordered_id;
pub mod record;
pub mod user;

pub use context::{Context, ContextBuilder, ContextGuard, ScopeFailure};
pub use db::{Db, DbExt, DbScope, LoadOptions};
pub use error::{ContextError, ErrorKind};
pub use ordered_id::OrderedId;
pub use record::{Record, RecordKey, RecordOrKey};
