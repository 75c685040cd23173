//! Key-value storage adapters
//!
//! `FileKeyValueStore` keeps every key in one JSON object on disk. Each call
//! takes an exclusive lock on a sidecar lock file so several `bb` processes
//! can share the same app directory.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;

use crate::domain::result::{Error, Result};
use crate::ports::KeyValueStore;

/// File name of the storage document inside the app directory
pub const STORAGE_FILE: &str = "storage.json";

/// JSON-file backed key-value store
pub struct FileKeyValueStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileKeyValueStore {
    /// Store at `<dir>/storage.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STORAGE_FILE))
    }

    pub fn new(path: PathBuf) -> Self {
        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        file.lock_exclusive()
            .map_err(|e| Error::storage(format!("Failed to lock {}: {}", self.lock_path.display(), e)))?;
        Ok(file)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            Error::storage(format!("Corrupt storage file {}: {}", self.path.display(), e))
        })
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(items)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Run a read-modify-write cycle under the file lock
    fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let lock = self.acquire_lock()?;
        let mut items = self.read_all()?;
        if f(&mut items) {
            self.write_all(&items)?;
        }
        FileExt::unlock(&lock)
            .map_err(|e| Error::storage(format!("Failed to unlock storage: {}", e)))?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let _lock = self.acquire_lock()?;
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.modify(|items| {
            items.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.modify(|items| items.remove(key).is_some())
    }
}

/// In-process store, used by tests and embedders without a filesystem
#[derive(Default)]
pub struct MemoryKeyValueStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.items
            .lock()
            .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items()?.remove(key);
        Ok(())
    }
}
