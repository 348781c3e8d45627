//! End-to-end walk through nested scopes and dataset overrides

use super::test_utils::{memory_root, Position, PositionKey};
use ctxrt::context::stack;
use ctxrt::{Context, ContextError, DbScope, ErrorKind, LoadOptions, RecordOrKey};

#[test]
fn test_nested_scope_dataset_walkthrough() {
    stack::isolated(|| {
        let root = memory_root("scenario", "root");
        root.run(|| -> Result<(), ContextError> {
            let nested = Context::builder().build()?;
            nested.run(|| -> Result<(), ContextError> {
                assert_eq!(Context::current()?.dataset(), "root");

                let current = Context::current()?;
                current.save_one(
                    &Position::new("K", "rates", 10),
                    &DbScope::new().with_dataset("sub"),
                )?;

                let key = || RecordOrKey::<Position>::Key(PositionKey::new("K"));
                let found: Option<Position> =
                    current.load_one(key(), &LoadOptions::new().in_dataset("sub"))?;
                assert_eq!(found, Some(Position::new("K", "rates", 10)));

                let missing = current.load_one::<Position>(key(), &LoadOptions::new());
                assert_eq!(missing.unwrap_err().kind(), ErrorKind::NotFound);

                // Relaxed lookup reports the same absence as None
                let relaxed: Option<Position> =
                    current.load_one(key(), &LoadOptions::new().allow_missing_record())?;
                assert!(relaxed.is_none());
                Ok(())
            })
        })
        .unwrap();

        assert_eq!(stack::depth(), 0);
    });
}

#[test]
fn test_records_visible_from_parent_through_shared_db() {
    stack::isolated(|| {
        let root = memory_root("scenario_shared", "\\desk");
        let guard = root.enter().unwrap();

        let child = Context::builder().dataset("\\desk\\child").build().unwrap();
        child
            .run(|| child.save_one(&Position::new("P1", "fx", 1), &DbScope::new()))
            .unwrap();

        let seen: Vec<Position> = root
            .load_all(&DbScope::new().with_dataset("child"))
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert!(root.load_all::<Position>(&DbScope::new()).unwrap().is_empty());

        guard.exit(Ok::<_, ContextError>(())).unwrap();
    });
}
