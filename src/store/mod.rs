//! Durable key-value slot used for the pending email challenge.
//!
//! Browser local storage semantics: string keys and values, survives reloads,
//! partitioned by origin. `MemoryStore` is the in-process fake used by tests.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::AppResult;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn clear(&self, key: &str) -> AppResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        (**self).set(key, value)
    }

    fn clear(&self, key: &str) -> AppResult<()> {
        (**self).clear(key)
    }
}
