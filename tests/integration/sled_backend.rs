//! Integration tests for contexts over the sled backend

use super::test_utils::{Position, PositionKey};
use ctxrt::config::ContextSettings;
use ctxrt::context::stack;
use ctxrt::db::{DbClass, DbSpec};
use ctxrt::log::TracingLog;
use ctxrt::user::UserKey;
use ctxrt::{Context, DbScope, ErrorKind, LoadOptions, RecordOrKey};
use std::sync::Arc;
use tempfile::TempDir;

fn settings(dir: &TempDir) -> ContextSettings {
    ContextSettings {
        db_dir: dir.path().to_path_buf(),
        ..ContextSettings::default()
    }
}

#[test]
fn test_sled_context_persists_between_opens() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);
    let spec = DbSpec::from_settings("temp;sled_persist", DbClass::Sled, &settings);

    stack::isolated(|| {
        let db = spec.open("temp;").unwrap();
        let root = Context::builder()
            .user(UserKey::new("writer"))
            .log(Arc::new(TracingLog::new("writer")))
            .db(db.clone())
            .dataset("\\eod")
            .build()
            .unwrap();
        root.run(|| root.save_one(&Position::new("P1", "rates", 3), &DbScope::new()))
            .unwrap();
        db.close_connection().unwrap();
    });

    stack::isolated(|| {
        let root = Context::builder()
            .user(UserKey::new("reader"))
            .log(Arc::new(TracingLog::new("reader")))
            .db(spec.open("temp;").unwrap())
            .dataset("\\eod")
            .build()
            .unwrap();
        let loaded: Option<Position> = root
            .load_one(
                RecordOrKey::Key(PositionKey::new("P1")),
                &LoadOptions::new(),
            )
            .unwrap();
        assert_eq!(loaded, Some(Position::new("P1", "rates", 3)));
    });
}

#[test]
fn test_testing_context_over_sled() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir);

    stack::isolated(|| {
        let context =
            Context::testing_with("sled_backend.testing", DbClass::Sled, &settings).unwrap();
        assert_eq!(context.db_key().db_id, "temp;sled_backend;testing");

        context
            .run(|| {
                context.save_one(&Position::new("P1", "a", 1), &DbScope::new())?;
                assert_eq!(context.load_all::<Position>(&DbScope::new())?.len(), 1);
                Ok::<_, ctxrt::ContextError>(())
            })
            .unwrap();

        assert!(context.load_all::<Position>(&DbScope::new()).unwrap().is_empty());
    });
}

#[test]
fn test_sled_refuses_to_drop_non_temp_db() {
    let dir = TempDir::new().unwrap();
    let spec = DbSpec::from_settings("eod_prod", DbClass::Sled, &settings(&dir));
    let db = spec.open("temp;").unwrap();

    let err = db.delete_all_and_drop_db().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
}
