//! Key-value persistence behind the session store.
//!
//! Mirrors the browser's local storage contract: string keys, string values,
//! synchronous access. `MemoryStore` backs tests and the mock backend,
//! `FileStore` keeps one file per key on disk.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::debug;

/// Extension used for files written by `FileStore`
const FILE_EXTENSION: &str = "json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize stored value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Injected string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store. Contents live as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store: each key is a `<key>.json` file.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Keys become file names, so only a conservative character set is allowed.
    fn is_valid_key(key: &str) -> bool {
        !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        if !Self::is_valid_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", key, FILE_EXTENSION)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.entry_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // Write-then-rename so a reader never sees a half-written record
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        debug!(key, path = %path.display(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.entry_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_dir() -> PathBuf {
        let n = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("portico-store-{}-{}", std::process::id(), n))
    }

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("user").unwrap(), None);

        store.set("user", "{\"id\":\"1\"}").unwrap();
        assert_eq!(store.get("user").unwrap().as_deref(), Some("{\"id\":\"1\"}"));
        assert_eq!(store.len(), 1);

        store.remove("user").unwrap();
        assert_eq!(store.get("user").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_store_remove_missing_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("nothing").is_ok());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = temp_dir();
        FileStore::new(dir.clone()).set("user", "hello").unwrap();

        let reopened = FileStore::new(dir.clone());
        assert_eq!(reopened.get("user").unwrap().as_deref(), Some("hello"));

        reopened.remove("user").unwrap();
        assert_eq!(reopened.get("user").unwrap(), None);
        // Removing twice is not an error
        reopened.remove("user").unwrap();

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_file_store_missing_dir_reads_as_empty() {
        let store = FileStore::new(temp_dir());
        assert_eq!(store.get("user").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let store = FileStore::new(temp_dir());
        assert!(matches!(store.get("../etc/passwd"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.set("", "x"), Err(StoreError::InvalidKey(_))));
        assert!(FileStore::is_valid_key("mockAuthUser"));
        assert!(FileStore::is_valid_key("user_1-a"));
    }
}
