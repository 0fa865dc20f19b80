// Cache module for the local store.
// Persists starred items and the user profile between runs.

pub mod paths;
pub mod store;

pub use paths::*;
pub use store::{CacheStore, Partition, clear_all};
