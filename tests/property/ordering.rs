//! Property-based tests for ordered identifier guarantees

use ctxrt::ordered_id::{self, OrderedIdGenerator};
use proptest::prelude::*;

proptest! {
    #[test]
    fn create_many_is_strictly_increasing(count in 0usize..2_000) {
        let ids = OrderedIdGenerator::new().create_many(count);
        prop_assert_eq!(ids.len(), count);
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn batches_continue_the_stream(first in 1usize..200, second in 1usize..200) {
        let generator = OrderedIdGenerator::new();
        let a = generator.create_many(first);
        let single = generator.create_one();
        let b = generator.create_many(second);
        prop_assert!(a[first - 1] < single);
        prop_assert!(single < b[0]);
    }

    #[test]
    fn readable_form_preserves_order(count in 2usize..500) {
        let ids = ordered_id::create_many(count);
        let readable: Vec<String> = ids.iter().map(|id| id.to_readable_string()).collect();
        prop_assert!(readable.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn random_uuids_of_other_versions_are_rejected(bytes in any::<[u8; 16]>()) {
        let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
        prop_assert!(ordered_id::validate(&uuid).is_err());
        prop_assert!(ordered_id::datetime_of(&uuid).is_err());
    }
}
