//! Integration tests for contexts, the storage gateway and configuration

mod gateway;
mod isolation;
mod scenario;
mod sled_backend;
mod test_utils;
