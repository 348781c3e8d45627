//! Integration tests for persistence calls delegated through a context

use super::test_utils::{in_root, FxPosition, Position, PositionKey};
use ctxrt::{DbScope, ErrorKind, LoadOptions, RecordOrKey};

fn key(id: &str) -> Option<RecordOrKey<Position>> {
    Some(RecordOrKey::Key(PositionKey::new(id)))
}

#[test]
fn test_save_one_upserts() {
    in_root("gateway_upsert", "\\", |root| {
        root.save_one(&Position::new("P1", "rates", 1), &DbScope::new())
            .unwrap();
        root.save_one(&Position::new("P1", "rates", 7), &DbScope::new())
            .unwrap();

        let all: Vec<Position> = root.load_all(&DbScope::new()).unwrap();
        assert_eq!(all, vec![Position::new("P1", "rates", 7)]);
    });
}

#[test]
fn test_load_many_preserves_input_order() {
    in_root("gateway_many", "\\", |root| {
        root.save_many(
            &[Position::new("P1", "a", 1), Position::new("P3", "c", 3)],
            &DbScope::new(),
        )
        .unwrap();

        let inline = Position::new("INLINE", "x", 0);
        let loaded = root
            .load_many(
                vec![
                    key("P3"),
                    None,
                    key("MISSING"),
                    Some(RecordOrKey::Record(inline.clone())),
                    key("P1"),
                ],
                &DbScope::new(),
            )
            .unwrap();

        assert_eq!(
            loaded,
            vec![
                Some(Position::new("P3", "c", 3)),
                None,
                None,
                Some(inline),
                Some(Position::new("P1", "a", 1)),
            ]
        );
    });
}

#[test]
fn test_missing_key_relaxation() {
    in_root("gateway_missing_key", "\\", |root| {
        let err = root
            .load_one(None::<RecordOrKey<Position>>, &LoadOptions::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let none = root
            .load_one(
                None::<RecordOrKey<Position>>,
                &LoadOptions::new().allow_missing_key(),
            )
            .unwrap();
        assert!(none.is_none());

        // Key relaxation does not cover a missing record
        let err = root
            .load_one(key("P9"), &LoadOptions::new().allow_missing_key())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    });
}

#[test]
fn test_subtypes_load_through_base_type() {
    in_root("gateway_subtype", "\\", |root| {
        root.save_one(&Position::new("P1", "rates", 1), &DbScope::new())
            .unwrap();
        root.save_one(
            &FxPosition {
                position_id: "P2".into(),
                book: Some("fx".into()),
                quantity: Some(2),
                currency: "EUR".into(),
            },
            &DbScope::new(),
        )
        .unwrap();

        let base: Vec<Position> = root.load_all(&DbScope::new()).unwrap();
        assert_eq!(base.len(), 2);

        let fx: Vec<FxPosition> = root.load_all(&DbScope::new()).unwrap();
        assert_eq!(fx.len(), 1);
        assert_eq!(fx[0].currency, "EUR");

        // A base record requested as the subtype is a type mismatch
        let err = root
            .load_one(
                Some(RecordOrKey::<FxPosition>::Key(PositionKey::new("P1"))),
                &LoadOptions::new(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Consistency);
    });
}

#[test]
fn test_load_filter_wildcards_unset_fields() {
    in_root("gateway_filter", "\\", |root| {
        root.save_many(
            &[
                Position::new("P1", "rates", 5),
                Position::new("P2", "rates", 6),
                Position::new("P3", "fx", 5),
            ],
            &DbScope::new(),
        )
        .unwrap();

        let filter = Position {
            position_id: "ignored".into(),
            book: Some("rates".into()),
            quantity: None,
        };
        // position_id is populated, so it has to match as well
        let none: Vec<Position> = root.load_filter(&filter, &DbScope::new()).unwrap();
        assert!(none.is_empty());

        let rates: Vec<Position> = root
            .load_filter(&serde_json::json!({ "book": "rates" }), &DbScope::new())
            .unwrap();
        assert_eq!(rates.len(), 2);

        let fives: Vec<Position> = root
            .load_filter(
                &serde_json::json!({ "book": null, "quantity": 5 }),
                &DbScope::new(),
            )
            .unwrap();
        assert_eq!(fives.len(), 2);
    });
}

#[test]
fn test_deletes_are_idempotent() {
    in_root("gateway_delete", "\\", |root| {
        root.save_many(
            &[Position::new("P1", "a", 1), Position::new("P2", "b", 2)],
            &DbScope::new(),
        )
        .unwrap();

        root.delete_one(&PositionKey::new("P1"), &DbScope::new())
            .unwrap();
        root.delete_one(&PositionKey::new("P1"), &DbScope::new())
            .unwrap();
        root.delete_many(
            &[PositionKey::new("P2"), PositionKey::new("NEVER")],
            &DbScope::new(),
        )
        .unwrap();

        assert!(root.load_all::<Position>(&DbScope::new()).unwrap().is_empty());
    });
}

#[test]
fn test_delete_all_and_drop_db_on_temp_db() {
    in_root("gateway_drop", "\\", |root| {
        root.save_one(&Position::new("P1", "a", 1), &DbScope::new())
            .unwrap();
        root.error_if_not_temp_db().unwrap();
        root.delete_all_and_drop_db().unwrap();
        assert!(root.load_all::<Position>(&DbScope::new()).unwrap().is_empty());
    });
}

#[test]
fn test_identity_token_is_passed_through() {
    in_root("gateway_identity", "\\", |root| {
        let scope = DbScope::new().with_identity("svc-pricing");
        root.save_one(&Position::new("P1", "a", 1), &scope).unwrap();
        let loaded: Vec<Position> = root.load_all(&scope).unwrap();
        assert_eq!(loaded.len(), 1);
    });
}
