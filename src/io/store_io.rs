use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::io::lock::LockError;
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::model::category::CategoryRegistry;
use crate::model::store::{Snapshot, TaskStore};
use crate::model::task::Task;

pub const TASKS_KEY: &str = "tasks";
pub const ARCHIVED_KEY: &str = "archived";
pub const CATEGORIES_KEY: &str = "categories";
pub const SEQUENCE_KEY: &str = "sequence";

/// Error type for persistence
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("stored '{key}' is malformed: {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
    #[error("could not encode '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Durable string storage addressed by key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadError { path, source: e }),
        }
    }

    /// Atomic per key. A failed write is copied into the recovery log before
    /// the error is returned.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let result = fs::create_dir_all(&self.dir)
            .and_then(|()| recovery::atomic_write(&path, value.as_bytes()));
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "write failed; payload kept in recovery log");
            recovery::log_recovery(
                &self.dir,
                RecoveryEntry::now(
                    RecoveryCategory::Write,
                    format!("{} write failed", key),
                    vec![
                        ("Target".to_string(), path.display().to_string()),
                        ("Error".to_string(), e.to_string()),
                    ],
                    value.to_string(),
                ),
            );
            return Err(StorageError::WriteError { path, source: e });
        }
        Ok(())
    }
}

/// In-process backend
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub entries: HashMap<String, String>,
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

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Load the full snapshot. Missing keys fall back to defaults (no tasks, the
/// seeded registry); malformed values are an error.
///
/// Records without an id (written by older versions) get fresh ones, and the
/// sequence is raised above every id present. A task found in both
/// sequences is kept only in the archive.
pub fn load_snapshot(store: &dyn KeyValueStore) -> Result<Snapshot, StorageError> {
    let active: Vec<Task> = read_key(store, TASKS_KEY)?.unwrap_or_default();
    let archived: Vec<Task> = read_key(store, ARCHIVED_KEY)?.unwrap_or_default();
    let categories: CategoryRegistry = read_key(store, CATEGORIES_KEY)?.unwrap_or_default();
    let sequence: u64 = read_key(store, SEQUENCE_KEY)?.unwrap_or(1);

    let mut tasks = TaskStore {
        active,
        archived,
        next_id: sequence,
    };
    let assigned = tasks.assign_missing_ids();
    if assigned > 0 {
        tracing::info!(count = assigned, "assigned ids to legacy task records");
    }
    let dropped = tasks.drop_archived_duplicates();
    if !dropped.is_empty() {
        tracing::warn!(ids = ?dropped, "dropped active copies of archived tasks");
    }

    Ok(Snapshot { tasks, categories })
}

/// Persist the full snapshot.
///
/// All values are encoded before anything is written. Keys are written
/// archive-first so an interrupted completion leaves a duplicate on disk
/// rather than a lost task.
pub fn save_snapshot(store: &mut dyn KeyValueStore, snapshot: &Snapshot) -> Result<(), StorageError> {
    let values = [
        (SEQUENCE_KEY, encode(SEQUENCE_KEY, &snapshot.tasks.next_id)?),
        (CATEGORIES_KEY, encode(CATEGORIES_KEY, &snapshot.categories)?),
        (ARCHIVED_KEY, encode(ARCHIVED_KEY, &snapshot.tasks.archived)?),
        (TASKS_KEY, encode(TASKS_KEY, &snapshot.tasks.active)?),
    ];
    for (key, value) in &values {
        store.set(key, value)?;
    }
    tracing::debug!(
        active = snapshot.tasks.active.len(),
        archived = snapshot.tasks.archived.len(),
        "snapshot saved"
    );
    Ok(())
}

/// True if nothing has been stored yet.
pub fn is_fresh(store: &dyn KeyValueStore) -> Result<bool, StorageError> {
    for key in [TASKS_KEY, ARCHIVED_KEY, CATEGORIES_KEY] {
        if store.get(key)?.is_some() {
            return Ok(false);
        }
    }
    Ok(true)
}

fn read_key<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        None => Ok(None),
        Some(text) if text.trim().is_empty() || text.trim() == "null" => Ok(None),
        Some(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StorageError::Decode {
                key: key.to_string(),
                source: e,
            }),
    }
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, StorageError> {
    serde_json::to_string_pretty(value).map_err(|e| StorageError::Encode {
        key: key.to_string(),
        source: e,
    })
}
