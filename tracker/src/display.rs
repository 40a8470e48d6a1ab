//! Rendering of the time log for people.
//!
//! The view lists every show with a readable name and a short duration,
//! longest first, and falls back to fixed messages when the log is empty or
//! cannot be loaded.

use std::fmt;

use tracing::error;

use crate::storage::{StorageError, TimeLogStore};
use crate::time_log::{TimeLog, TimeLogWriter};

/// Shown when the log has no entries.
pub const EMPTY_MESSAGE: &str = "No time logged yet.";

/// Shown when the log could not be read.
pub const LOAD_ERROR_MESSAGE: &str = "Error loading log.";

/// Shown when the log could not be cleared.
pub const CLEAR_ERROR_MESSAGE: &str = "Failed to clear the log.";

/// Formats milliseconds as hours and minutes.
///
/// Durations under a minute render as `< 1m`; zero components are omitted.
///
/// # Examples
///
/// ```
/// use watchtime_tracker::display::format_duration;
///
/// assert_eq!(format_duration(8_100_000), "2h 15m");
/// assert_eq!(format_duration(2_700_000), "45m");
/// assert_eq!(format_duration(10_800_000), "3h");
/// assert_eq!(format_duration(30_000), "< 1m");
/// ```
#[must_use]
pub fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;

    match (hours, mins) {
        (0, 0) => "< 1m".to_string(),
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Turns an identifier back into something readable: `one-piece` → `one piece`.
#[must_use]
pub fn readable_name(identifier: &str) -> String {
    identifier.replace('-', " ")
}

/// One rendered log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Readable show name.
    pub name: String,
    /// Raw identifier the entry is stored under.
    pub identifier: String,
    /// Formatted duration.
    pub duration: String,
}

/// What the display surface shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogView {
    /// Entries sorted by descending duration.
    Entries(Vec<LogLine>),
    Empty,
    LoadFailed,
}

impl LogView {
    /// Builds the view for an already-loaded log.
    #[must_use]
    pub fn from_log(log: &TimeLog) -> Self {
        if log.is_empty() {
            return Self::Empty;
        }

        let lines = log
            .entries_by_duration()
            .into_iter()
            .map(|(show, ms)| LogLine {
                name: readable_name(show.as_str()),
                identifier: show.to_string(),
                duration: format_duration(ms),
            })
            .collect();
        Self::Entries(lines)
    }

    /// Loads the log through `writer` and builds the view.
    ///
    /// Load failures are logged and turned into [`LogView::LoadFailed`].
    pub async fn load<S: TimeLogStore>(writer: &TimeLogWriter<S>) -> Self {
        match writer.load().await {
            Ok(log) => Self::from_log(&log),
            Err(e) => {
                error!(error = %e, "Error loading time log");
                Self::LoadFailed
            }
        }
    }
}

impl fmt::Display for LogView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => writeln!(f, "{EMPTY_MESSAGE}"),
            Self::LoadFailed => writeln!(f, "{LOAD_ERROR_MESSAGE}"),
            Self::Entries(lines) => {
                let width = lines
                    .iter()
                    .map(|line| line.name.chars().count())
                    .max()
                    .unwrap_or(0);
                for line in lines {
                    writeln!(f, "{:<width$}  {}", line.name, line.duration)?;
                }
                Ok(())
            }
        }
    }
}

/// Removes the persisted log and returns the refreshed view.
///
/// # Errors
///
/// Returns the store's error when the record could not be removed; the
/// caller shows [`CLEAR_ERROR_MESSAGE`].
pub async fn clear_log<S: TimeLogStore>(
    writer: &TimeLogWriter<S>,
) -> Result<LogView, StorageError> {
    writer.clear().await.inspect_err(|e| {
        error!(error = %e, "Error clearing time log");
    })?;
    Ok(LogView::load(writer).await)
}
