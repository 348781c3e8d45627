//! Property-based tests for dataset composition

use ctxrt::dataset;
use proptest::prelude::*;

fn level() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_]{1,8}"
}

proptest! {
    #[test]
    fn combine_concatenates_levels(
        left in prop::collection::vec(level(), 0..4),
        right in prop::collection::vec(level(), 0..4),
    ) {
        let sep = dataset::SEPARATOR.to_string();
        let left_token = left.join(&sep);
        let right_token = right.join(&sep);
        let combined = dataset::combine(&[left_token.as_str(), right_token.as_str()]).unwrap();

        let mut expected = left.clone();
        expected.extend(right.clone());
        prop_assert_eq!(dataset::to_levels(&combined).unwrap(), expected);
    }

    #[test]
    fn normalize_is_idempotent(levels in prop::collection::vec(level(), 0..5)) {
        let token = levels.join(&dataset::SEPARATOR.to_string());
        let once = dataset::normalize(&token).unwrap();
        prop_assert!(once.starts_with(dataset::SEPARATOR));
        prop_assert_eq!(dataset::normalize(&once).unwrap(), once.clone());
    }

    #[test]
    fn lookup_list_walks_to_root(levels in prop::collection::vec(level(), 0..5)) {
        let token = levels.join(&dataset::SEPARATOR.to_string());
        let lookups = dataset::to_lookup_list(&token).unwrap();
        prop_assert_eq!(lookups.len(), levels.len() + 1);
        prop_assert_eq!(lookups.last().unwrap(), &dataset::root());
    }
}
