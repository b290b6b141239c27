use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::KeyValueStore;
use crate::error::{AppError, AppResult};

type Partitions = BTreeMap<String, BTreeMap<String, String>>;

/// JSON file on disk holding one map per origin:
/// `{"https://example.com": {"email_otp": "..."}}`.
pub struct FileStore {
    path: PathBuf,
    origin: String,
    // serialises read-modify-write cycles within this process
    guard: Mutex<()>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>, origin: impl Into<String>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            origin: origin.into(),
            guard: Mutex::new(()),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn load(&self) -> AppResult<Partitions> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Partitions::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::StorageError(format!("corrupt store {}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Partitions::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, partitions: &Partitions) -> AppResult<()> {
        let raw = serde_json::to_string_pretty(partitions)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> AppResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _lock = self
            .guard
            .lock()
            .map_err(|_| AppError::StorageError("file store poisoned".to_string()))?;
        let mut partitions = self.load()?;
        let entries = partitions.entry(self.origin.clone()).or_default();
        f(entries);
        if entries.is_empty() {
            partitions.remove(&self.origin);
        }
        self.save(&partitions)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let partitions = self.load()?;
        Ok(partitions
            .get(&self.origin)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn clear(&self, key: &str) -> AppResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}
