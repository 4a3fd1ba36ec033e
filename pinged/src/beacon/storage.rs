use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use maybe_sync::{MaybeSend, MaybeSync};
use parking_lot::RwLock;

use crate::error::StorageError;

/// Key-value persistence scoped to the current device, holding string values.
///
/// Only one writer ever uses the storage, so implementations need no transactional guarantees
/// beyond making each `insert` call durable before returning.
pub trait PersistentStorage: MaybeSend + MaybeSync {
    /// Returns the value stored under the key, or `None` if there is no such value.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    /// Stores the value under the key, replacing the previous one.
    fn insert(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory storage. Clones share the same data, so a test can keep a handle to inspect what
/// was persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage with one pre-populated entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::default();
        storage
            .entries
            .write()
            .insert(key.to_string(), value.to_string());
        storage
    }
}

impl PersistentStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn insert(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Stores every key as a separate file in the given folder.
///
/// Values are first written to a temporary file which then replaces the old one, so an
/// interrupted write never corrupts the previously stored value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    folder_path: PathBuf,
}

impl FileStorage {
    /// Creates a new instance. If the folder doesn't exist, it is created.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        std::fs::create_dir_all(path.as_ref())?;
        Ok(Self {
            folder_path: path.as_ref().into(),
        })
    }

    fn get_file_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        self.folder_path.join(format!("{file_name}.json"))
    }
}

impl PersistentStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let file_path = self.get_file_path(key);
        match std::fs::read_to_string(&file_path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn insert(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let file_path = self.get_file_path(key);
        let tmp_path = file_path.with_extension("json.tmp");

        std::fs::write(&tmp_path, value)?;
        std::fs::rename(&tmp_path, &file_path)?;
        debug!("Entry {key} saved to {file_path:?}");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_folder(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "pinged-storage-{name}-{}",
            uuid::Uuid::now_v7().simple()
        ));
        let _ = std::fs::remove_dir_all(&path);
        path
    }

    #[test]
    fn memory_storage_clones_share_data() {
        let storage = MemoryStorage::new();
        let handle = storage.clone();

        storage.insert("key", "value").expect("memory insert");
        assert_eq!(handle.get("key").expect("memory get").as_deref(), Some("value"));
        assert_eq!(handle.get("other").expect("memory get"), None);
    }

    #[test]
    fn file_storage_round_trip() {
        let folder = temp_folder("round-trip");
        let storage = FileStorage::new(&folder).expect("create folder");

        assert_eq!(storage.get("pinged_beacons_v1").expect("read"), None);
        storage.insert("pinged_beacons_v1", "[]").expect("write");
        storage.insert("pinged_beacons_v1", "[1]").expect("overwrite");
        assert_eq!(
            storage.get("pinged_beacons_v1").expect("read").as_deref(),
            Some("[1]")
        );
        assert!(folder.join("pinged_beacons_v1.json").exists());
        assert!(!folder.join("pinged_beacons_v1.json.tmp").exists());

        let _ = std::fs::remove_dir_all(&folder);
    }

    #[test]
    fn file_names_are_sanitized() {
        let folder = temp_folder("sanitize");
        let storage = FileStorage::new(&folder).expect("create folder");

        storage.insert("../escape/key", "x").expect("write");
        assert!(folder.join("___escape_key.json").exists());

        let _ = std::fs::remove_dir_all(&folder);
    }
}
