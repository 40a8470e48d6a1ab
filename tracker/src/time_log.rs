//! The persisted time log and its writer.
//!
//! The time log maps show identifiers to cumulative milliseconds watched. It
//! lives in a single named record of a [`TimeLogStore`]; the writer applies the
//! logging rules and performs a read-modify-write for every flushed session.
//!
//! # Logging Rules
//!
//! A session is written when all of the following hold:
//!
//! - the show is not the sentinel identifier
//! - the duration is non-zero
//! - the duration reaches [`MIN_LOG_DURATION`], or the flush is forced
//!   (the tab was closed)
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use watchtime_tracker::storage::MemoryStore;
//! use watchtime_tracker::time_log::TimeLogWriter;
//! use watchtime_tracker::types::ShowIdentifier;
//!
//! # tokio_test::block_on(async {
//! let writer = TimeLogWriter::new(MemoryStore::new());
//! let show = ShowIdentifier::new("one-piece");
//!
//! assert!(writer.record(&show, Duration::from_secs(360), false).await);
//! assert!(!writer.record(&show, Duration::from_secs(60), false).await);
//!
//! let log = writer.load().await.unwrap();
//! assert_eq!(log.get(&show), 360_000);
//! # });
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::MIN_LOG_DURATION;
use crate::registry::FinishedSession;
use crate::storage::{StorageError, TimeLogStore};
use crate::types::ShowIdentifier;

/// Returns `true` when a session of `duration` for `show` should be logged.
#[must_use]
pub fn qualifies_for_log(show: &ShowIdentifier, duration: Duration, force: bool) -> bool {
    !show.is_unknown() && !duration.is_zero() && (force || duration >= MIN_LOG_DURATION)
}

/// Cumulative watch time per show, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeLog(HashMap<ShowIdentifier, u64>);

impl TimeLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Milliseconds logged for `show`, zero when absent.
    #[must_use]
    pub fn get(&self, show: &ShowIdentifier) -> u64 {
        self.0.get(show).copied().unwrap_or(0)
    }

    /// Adds `duration` to the show's total and returns the new total.
    pub fn add(&mut self, show: &ShowIdentifier, duration: Duration) -> u64 {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let total = self.0.entry(show.clone()).or_insert(0);
        *total = total.saturating_add(ms);
        *total
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum over all shows, in milliseconds.
    #[must_use]
    pub fn total_ms(&self) -> u64 {
        self.0
            .values()
            .fold(0u64, |acc, ms| acc.saturating_add(*ms))
    }

    /// Entries sorted by descending duration; ties are ordered by identifier.
    #[must_use]
    pub fn entries_by_duration(&self) -> Vec<(&ShowIdentifier, u64)> {
        let mut entries: Vec<(&ShowIdentifier, u64)> =
            self.0.iter().map(|(show, ms)| (show, *ms)).collect();
        entries.sort_by(|(a_show, a_ms), (b_show, b_ms)| {
            b_ms.cmp(a_ms).then_with(|| a_show.cmp(b_show))
        });
        entries
    }
}

impl FromIterator<(ShowIdentifier, u64)> for TimeLog {
    fn from_iter<I: IntoIterator<Item = (ShowIdentifier, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Writes finished sessions into the time log held by a store.
///
/// The read-modify-write is not atomic with respect to other writers of the
/// same store. Within one process the tracker serializes all calls.
#[derive(Debug)]
pub struct TimeLogWriter<S> {
    store: S,
}

impl<S: TimeLogStore> TimeLogWriter<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Adds `duration` to the log for `show` if the logging rules allow it.
    ///
    /// Storage failures are logged and swallowed.
    ///
    /// # Returns
    ///
    /// `true` when the log was updated.
    pub async fn record(&self, show: &ShowIdentifier, duration: Duration, force: bool) -> bool {
        if !qualifies_for_log(show, duration, force) {
            debug!(
                show = %show,
                duration_ms = duration.as_millis() as u64,
                forced = force,
                "Skipping log entry"
            );
            return false;
        }

        match self.add(show, duration).await {
            Ok(total_ms) => {
                info!(
                    show = %show,
                    duration_ms = duration.as_millis() as u64,
                    total_ms,
                    "Logged watch time"
                );
                true
            }
            Err(e) => {
                error!(show = %show, error = %e, "Error saving time log");
                false
            }
        }
    }

    /// Records a session returned by the timer registry.
    pub async fn record_session(&self, session: &FinishedSession) -> bool {
        self.record(&session.show, session.duration, session.forced)
            .await
    }

    /// Reads the current log; a missing record is an empty log.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the record cannot be read.
    pub async fn load(&self) -> Result<TimeLog, StorageError> {
        Ok(self.store.get().await?.unwrap_or_default())
    }

    /// Removes the whole record.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the record cannot be removed.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove().await?;
        info!("Time log cleared");
        Ok(())
    }

    async fn add(&self, show: &ShowIdentifier, duration: Duration) -> Result<u64, StorageError> {
        let mut log = self.load().await?;
        let total = log.add(show, duration);
        self.store.set(&log).await?;
        Ok(total)
    }
}
