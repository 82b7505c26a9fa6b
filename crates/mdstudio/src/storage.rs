//! Durable key-value storage behind the buffer store.
//!
//! The file backend keeps every entry in one JSON document. It is read once
//! when opened and rewritten in full (temp file + rename) on every `set`.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const VERSION_KEY: &str = "app-version";
pub const CONTENT_KEY: &str = "markdown-content";

const STORAGE_FILE_NAME: &str = "storage.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage is unavailable: {0}")]
    Unavailable(String),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Session-only storage. Used when the durable backend cannot be opened.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store file inside `dir`, creating nothing until the first write.
    pub fn in_dir(dir: &Path) -> Result<Self, StorageError> {
        Self::open(dir.join(STORAGE_FILE_NAME))
    }

    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        let entries = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => Self::parse(&path, &content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No stored buffer at {}, starting fresh", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        log::debug!("Opened storage {} ({} entries)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(path: &Path, content: &str) -> Result<BTreeMap<String, String>, StorageError> {
        let value: Value = serde_json::from_str(content).map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

        // Non-string values are ignored rather than failing the whole store
        let Value::Object(map) = value else {
            return Err(StorageError::Unavailable(format!(
                "{} does not contain a JSON object",
                path.display()
            )));
        };
        Ok(map
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect())
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source: std::io::Error| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(entries).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut next = self.entries.clone();
        next.insert(key.to_string(), value.to_string());
        // Only commit in memory once the file is durable
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get(CONTENT_KEY).unwrap(), None);
        store.set(CONTENT_KEY, "hello").unwrap();
        assert_eq!(store.get(CONTENT_KEY).unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();

        let mut store = FileStore::in_dir(dir.path()).unwrap();
        store.set(VERSION_KEY, "v1.0").unwrap();
        store.set(CONTENT_KEY, "# persisted").unwrap();
        drop(store);

        let reopened = FileStore::in_dir(dir.path()).unwrap();
        assert_eq!(reopened.get(VERSION_KEY).unwrap().as_deref(), Some("v1.0"));
        assert_eq!(reopened.get(CONTENT_KEY).unwrap().as_deref(), Some("# persisted"));
    }

    #[test]
    fn test_file_store_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        let mut store = FileStore::in_dir(&nested).unwrap();
        store.set(CONTENT_KEY, "x").unwrap();
        assert!(nested.join(STORAGE_FILE_NAME).exists());
        assert!(!nested.join("storage.json.tmp").exists());
    }

    #[test]
    fn test_file_store_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::in_dir(dir.path()).unwrap();
        store.set(CONTENT_KEY, "first").unwrap();
        store.set(CONTENT_KEY, "second").unwrap();

        let reopened = FileStore::in_dir(dir.path()).unwrap();
        assert_eq!(reopened.get(CONTENT_KEY).unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STORAGE_FILE_NAME), "{not json").unwrap();

        let result = FileStore::in_dir(dir.path());
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
    }

    #[test]
    fn test_empty_file_is_treated_as_fresh() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STORAGE_FILE_NAME), "  \n").unwrap();

        let store = FileStore::in_dir(dir.path()).unwrap();
        assert_eq!(store.get(CONTENT_KEY).unwrap(), None);
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        let dir = TempDir::new().unwrap();
        // A directory in place of the file makes the rename fail
        let blocked = dir.path().join("blocked");
        fs::create_dir_all(blocked.join(STORAGE_FILE_NAME)).unwrap();

        let mut store = FileStore {
            path: blocked.join(STORAGE_FILE_NAME),
            entries: BTreeMap::new(),
        };
        assert!(store.set(CONTENT_KEY, "lost").is_err());
        assert_eq!(store.get(CONTENT_KEY).unwrap(), None);
    }
}
