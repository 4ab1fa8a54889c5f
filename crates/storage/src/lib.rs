#![forbid(unsafe_code)]

pub mod attempt_cache;
pub mod repository;
pub mod sqlite;

pub use attempt_cache::LocalAttemptCache;
pub use repository::{InMemoryKeyValueStore, KeyValueStore, Storage, StorageError};
