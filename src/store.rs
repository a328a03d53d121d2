//! Key-value persistence
//!
//! This module provides the flat key-value store that preferences, saved
//! titles and search history live in. The store is an injected
//! collaborator: callers depend on the [`KeyValueStore`] trait, so the rest
//! of the crate is testable without touching the filesystem. The default
//! backend keeps one JSON document per key in the platform data directory.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to determine the data directory location
    #[error("Failed to determine data directory location")]
    DataDirectoryNotFound,

    /// Failed to create or access the data directory
    #[error("Failed to create data directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read a stored value
    #[error("Failed to read store file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a stored value
    #[error("Failed to write store file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to remove a stored value
    #[error("Failed to remove store file {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A flat string-keyed store of JSON documents.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes the value stored under `key`. Removing an absent key is not
    /// an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// File-backed store: one file per key in an application data directory.
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Opens the store in the platform's standard data directory for this
    /// application, creating it if needed.
    pub fn open() -> Result<Self, StoreError> {
        let proj_dirs = directories::ProjectDirs::from("net", "wheretowatch", "where-to-watch")
            .ok_or(StoreError::DataDirectoryNotFound)?;
        Self::at(proj_dirs.data_dir().to_path_buf())
    }

    /// Opens the store rooted at an explicit directory.
    pub fn at(data_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&data_dir).map_err(|e| StoreError::DirectoryCreationFailed {
            path: data_dir.clone(),
            source: e,
        })?;
        Ok(Self { data_dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", sanitize_name(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| StoreError::ReadFailed {
            path: path.clone(),
            source: e,
        })?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        fs::write(&path, value).map_err(|e| StoreError::WriteFailed { path, source: e })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(&path).map_err(|e| StoreError::RemoveFailed { path, source: e })
    }
}

/// In-memory store, for embedding and tests.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().ok().and_then(|m| m.get(key).cloned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Ok(mut map) = self.values.lock() {
            map.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if let Ok(mut map) = self.values.lock() {
            map.remove(key);
        }
        Ok(())
    }
}

/// Sanitizes a key for use in file paths
///
/// Converts to lowercase and replaces all characters that are not
/// a-z, 0-9, or hyphen with underscores.
fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("wtw:saved"), "wtw_saved");
        assert_eq!(sanitize_name("wtw_prefs_v1"), "wtw_prefs_v1");
        assert_eq!(sanitize_name("With Spaces"), "with_spaces");
        assert_eq!(sanitize_name("With-Hyphens"), "with-hyphens");
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get("missing").unwrap().is_none());

        store.set("key", "{\"a\":1}").unwrap();
        assert_eq!(store.get("key").unwrap().as_deref(), Some("{\"a\":1}"));

        store.remove("key").unwrap();
        assert!(store.get("key").unwrap().is_none());

        // Removing an absent key is fine
        store.remove("key").unwrap();
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = std::env::temp_dir().join("wtw_store_test");
        let store = FileStore::at(dir.clone()).unwrap();

        store.set("wtw:saved", "[]").unwrap();
        assert_eq!(store.get("wtw:saved").unwrap().as_deref(), Some("[]"));

        store.remove("wtw:saved").unwrap();
        assert!(store.get("wtw:saved").unwrap().is_none());

        fs::remove_dir_all(&dir).ok();
    }
}
