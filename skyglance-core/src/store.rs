//! String key-value persistence used for the unit setting and the weather cache.

use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use crate::error::StoreError;

pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// A JSON object on disk, loaded once and rewritten on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let entries = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "opened store");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

impl FileStore {
    /// Apply `change` to a copy of the entries; the copy replaces the
    /// in-memory map only once it is on disk.
    fn update(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        change(&mut next);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }

        let json = serde_json::to_string_pretty(&next)?;
        fs::write(&self.path, json).map_err(|source| io_error(&self.path, source))?;

        *entries = next;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_last_writer_wins() {
        let store = MemoryStore::new();
        assert_eq!(store.get("unit"), None);

        store.set("unit", "metric").unwrap();
        store.set("unit", "imperial").unwrap();

        assert_eq!(store.get("unit").as_deref(), Some("imperial"));
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("weatherData_London", "{\"name\":\"London\"}").unwrap();
        store.set("unit", "imperial").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("unit").as_deref(), Some("imperial"));
        assert_eq!(
            reopened.get("weatherData_London").as_deref(),
            Some("{\"name\":\"London\"}")
        );
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn file_store_keeps_old_value_when_write_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("unit", "metric").unwrap();

        // A directory in place of the file makes every write fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.set("unit", "imperial").is_err());
        assert_eq!(store.get("unit").as_deref(), Some("metric"));

        assert!(store.set("weatherData_Oslo", "{}").is_err());
        assert_eq!(store.get("weatherData_Oslo"), None);

        assert!(store.remove("unit").is_err());
        assert_eq!(store.get("unit").as_deref(), Some("metric"));
    }

    #[test]
    fn remove_deletes_key_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).unwrap();
        store.set("unit", "imperial").unwrap();
        store.remove("unit").unwrap();
        assert_eq!(store.get("unit"), None);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("unit"), None);
    }

    #[test]
    fn file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        let err = FileStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Serialize(_)));
    }

    #[test]
    fn file_store_treats_empty_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("unit"), None);
    }
}
