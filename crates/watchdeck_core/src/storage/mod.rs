use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use log::{info, warn};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

pub mod continue_watching;
pub mod json_file;
pub mod memory;
pub mod profiles;
pub mod schema;
pub mod watchlist;

use json_file::JsonFileStore;
use memory::MemoryStore;
use profiles::StoredProfile;
use schema::{decode_collection, encode_collection, StorageKeys};

use crate::models::{ContinueWatchingItem, WatchlistItem};

/// String key-value persistence the store is built on.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a valid state document: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("at most {limit} profiles can exist")]
    ProfileLimit { limit: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Collections rewritten into the current envelope.
    pub upgraded: usize,
    /// Records dropped because they no longer decode.
    pub discarded: usize,
}

impl MigrationReport {
    fn record(&mut self, outcome: Option<usize>) {
        if let Some(discarded) = outcome {
            self.upgraded += 1;
            self.discarded += discarded;
        }
    }
}

/// Profiles, active-profile pointer, watchlist and continue-watching list
/// over an injected key-value backend.
///
/// Every mutation is a full read-modify-write of one collection, serialised
/// by `write_lock`. Reads never fail: backend errors, missing keys and
/// unreadable documents all come back as empty collections.
#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
    write_lock: Arc<Mutex<()>>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            backend,
            keys: StorageKeys::new(namespace),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn open(data_dir: PathBuf, namespace: &str) -> Self {
        Self::new(Arc::new(JsonFileStore::new(data_dir)), namespace)
    }

    pub fn in_memory(namespace: &str) -> Self {
        Self::new(Arc::new(MemoryStore::new()), namespace)
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Rewrites any collection still in the unversioned layout. Records
    /// that no longer decode are dropped by the rewrite and counted in
    /// `discarded`.
    pub fn migrate_if_needed(&self) -> Result<MigrationReport, StoreError> {
        let _guard = self.lock();
        let mut report = MigrationReport::default();

        report.record(self.upgrade_collection::<StoredProfile>(&self.keys.profiles)?);
        report.record(self.upgrade_collection::<WatchlistItem>(&self.keys.watchlist)?);
        report.record(
            self.upgrade_collection::<ContinueWatchingItem>(&self.keys.continue_watching)?,
        );

        if report.upgraded > 0 {
            info!(
                "upgraded {} stored collection(s) to the current schema",
                report.upgraded
            );
        }
        Ok(report)
    }

    /// Returns the number of discarded records when the collection was
    /// rewritten.
    fn upgrade_collection<T>(&self, key: &str) -> Result<Option<usize>, StoreError>
    where
        T: DeserializeOwned + Serialize,
    {
        let Some(raw) = self.read_raw(key) else {
            return Ok(None);
        };

        match decode_collection::<T>(key, &raw) {
            Ok(decoded) if decoded.needs_upgrade() => {
                if decoded.skipped > 0 {
                    warn!(
                        "migration of {key} discards {} unreadable record(s)",
                        decoded.skipped
                    );
                }
                self.write_collection(key, &decoded.items)?;
                Ok(Some(decoded.skipped))
            }
            Ok(_) => Ok(None),
            Err(error) => {
                warn!("leaving {key} untouched during migration: {error}");
                Ok(None)
            }
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(error) => {
                warn!("failed to read {key}, treating it as empty: {error}");
                None
            }
        }
    }

    pub(crate) fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(raw) = self.read_raw(key) else {
            return Vec::new();
        };

        match decode_collection(key, &raw) {
            Ok(decoded) => decoded.items,
            Err(error) => {
                warn!("failed to decode {key}, treating it as empty: {error}");
                Vec::new()
            }
        }
    }

    pub(crate) fn write_collection<T: Serialize>(
        &self,
        key: &str,
        items: &[T],
    ) -> Result<(), StoreError> {
        let serialized = encode_collection(items).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key, &serialized)
    }

    pub(crate) fn read_scalar(&self, key: &str) -> Option<String> {
        self.read_raw(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub(crate) fn write_scalar(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.backend.set(key, value)
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
