//! User identity reference

use crate::record::RecordKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the user a context acts for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserKey {
    pub username: String,
}

impl UserKey {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl RecordKey for UserKey {
    const TABLE: &'static str = "User";

    fn key_fields(&self) -> Vec<String> {
        vec![self.username.clone()]
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}
