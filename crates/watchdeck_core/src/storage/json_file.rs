use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use log::{debug, warn};

use super::{KeyValueStore, StoreError};

pub const STATE_FILE_NAME: &str = "watchdeck-state.json";

/// Key-value backend persisted as one JSON object on disk. Every write goes
/// through a temp file and a rename so a crash never leaves a half-written
/// document behind.
pub struct JsonFileStore {
    db_path: PathBuf,
    io_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self::at_path(base_dir.join(STATE_FILE_NAME))
    }

    pub fn at_path(db_path: PathBuf) -> Self {
        Self {
            db_path,
            io_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        if !self.db_path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw = fs::read_to_string(&self.db_path).map_err(|source| StoreError::Io {
            path: self.db_path.clone(),
            source,
        })?;

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: self.db_path.clone(),
            source,
        })
    }

    /// Like `read_entries`, but a corrupt document is moved aside so the
    /// write can start over from an empty map.
    fn read_entries_for_write(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match self.read_entries() {
            Err(StoreError::Corrupt { path, source }) => {
                let backup = path.with_extension("corrupt");
                warn!(
                    "{} is unreadable ({source}); moving it to {} and starting fresh",
                    path.display(),
                    backup.display()
                );
                fs::rename(&path, &backup).map_err(|source| StoreError::Io {
                    path: backup.clone(),
                    source,
                })?;
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        self.ensure_parent_dir()?;
        let tmp_path = self.db_path.with_extension("tmp");

        let serialized =
            serde_json::to_string_pretty(entries).map_err(|source| StoreError::Serialize {
                key: self.db_path.display().to_string(),
                source,
            })?;
        fs::write(&tmp_path, serialized).map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &self.db_path).map_err(|source| StoreError::Io {
            path: self.db_path.clone(),
            source,
        })?;

        Ok(())
    }

    fn ensure_parent_dir(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)?;
        debug!("wrote {key} to {}", self.db_path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_entries_for_write()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}
