//! Persistence for the time log record.
//!
//! The time log lives in a single named record (`timeLog`). Stores expose the
//! three operations the tracker needs on that record: get, set, and remove.
//! All operations are asynchronous and return a `Result`; callers decide
//! whether failures are fatal.
//!
//! # Stores
//!
//! - [`MemoryStore`]: in-process record, cheap to clone and share; used for
//!   tests and short-lived runs.
//! - [`FileStore`]: JSON document on disk, written atomically via a temporary
//!   file and rename.
//!
//! # File Format
//!
//! ```json
//! {
//!   "timeLog": {
//!     "one-piece": 360000,
//!     "netflix-80107103": 5400000
//!   }
//! }
//! ```

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::time_log::TimeLog;

/// Errors that can occur while accessing the time log record.
#[derive(Error, Debug)]
pub enum StorageError {
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document is not valid JSON for a time log.
    #[error("malformed time log: {0}")]
    Json(#[from] serde_json::Error),

    /// The record path has no parent directory to write into.
    #[error("record path has no parent directory")]
    NoParentDirectory,

    /// The store cannot serve requests.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Access to the single named record holding the time log.
pub trait TimeLogStore {
    /// Reads the record; `Ok(None)` when it has never been written or was removed.
    fn get(&self) -> impl Future<Output = Result<Option<TimeLog>, StorageError>> + Send;

    /// Replaces the record.
    fn set(&self, log: &TimeLog) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Deletes the record. Removing a missing record succeeds.
    fn remove(&self) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// In-memory record store.
///
/// Clones share the same record, so a test can keep a handle while the
/// tracker owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Arc<Mutex<Option<TimeLog>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose record already holds `log`.
    #[must_use]
    pub fn with_log(log: TimeLog) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(log))),
        }
    }

    /// Current record contents.
    #[must_use]
    pub fn snapshot(&self) -> Option<TimeLog> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<TimeLog>> {
        self.record
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl TimeLogStore for MemoryStore {
    async fn get(&self) -> Result<Option<TimeLog>, StorageError> {
        Ok(self.snapshot())
    }

    async fn set(&self, log: &TimeLog) -> Result<(), StorageError> {
        *self.lock() = Some(log.clone());
        Ok(())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        *self.lock() = None;
        Ok(())
    }
}

/// On-disk document wrapping the named record.
///
/// The serde key must stay equal to [`TIME_LOG_KEY`](crate::config::TIME_LOG_KEY).
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredDocument {
    #[serde(rename = "timeLog", default, skip_serializing_if = "Option::is_none")]
    time_log: Option<TimeLog>,
}

/// JSON file record store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TimeLogStore for FileStore {
    async fn get(&self) -> Result<Option<TimeLog>, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "No time log file yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        let document: StoredDocument = serde_json::from_str(&contents)?;
        Ok(document.time_log)
    }

    async fn set(&self, log: &TimeLog) -> Result<(), StorageError> {
        let document = StoredDocument {
            time_log: Some(log.clone()),
        };
        let json = serde_json::to_vec_pretty(&document)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || atomic_write(&path, &json))
            .await
            .map_err(|e| StorageError::Unavailable(format!("write task failed: {e}")))??;

        debug!(path = %self.path.display(), entries = log.len(), "Time log written");
        Ok(())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Time log file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes bytes to a file atomically: write to a temp file in the same
/// directory, then rename over the target.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(StorageError::NoParentDirectory)?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
