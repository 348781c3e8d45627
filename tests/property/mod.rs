//! Property-based tests for identifier ordering and dataset composition

mod dataset_properties;
mod ordering;
