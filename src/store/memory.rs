use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::KeyValueStore;
use crate::error::{AppError, AppResult};

/// In-memory store. Clones share the same map, so a test can keep a handle
/// and inspect what the verifier wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::StorageError("memory store poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> AppResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
