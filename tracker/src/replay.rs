//! Replay of recorded browser event streams.
//!
//! A stream holds one [`TimedEvent`](crate::events::TimedEvent) per line.
//! Malformed lines are logged and skipped; the events after them still apply.
//! When the input ends, every timer still open is stopped as if its tab were
//! closed, at the latest event instant seen in the stream.

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::error::Result;
use crate::events::parse_event_line;
use crate::storage::TimeLogStore;
use crate::tracker::Tracker;

/// Counters for a finished replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Lines read, including blank and comment lines.
    pub lines: usize,
    /// Events handed to the tracker.
    pub handled: usize,
    /// Malformed lines that were skipped.
    pub skipped: usize,
    /// Sessions written to the time log by the end-of-input flush.
    pub sessions_logged: usize,
    /// Instant used for the end-of-input flush.
    pub ended_at: Option<DateTime<Utc>>,
}

/// Line-by-line replay state.
///
/// The caller owns the read loop, so it can interleave lines with other
/// futures such as a shutdown signal.
#[derive(Debug, Default)]
pub struct Replay {
    summary: ReplaySummary,
    last_at: Option<DateTime<Utc>>,
}

impl Replay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest event instant seen so far.
    #[must_use]
    pub fn last_at(&self) -> Option<DateTime<Utc>> {
        self.last_at
    }

    #[must_use]
    pub fn summary(&self) -> ReplaySummary {
        self.summary
    }

    /// Parses one line and hands its event to `tracker`.
    pub async fn feed_line<S: TimeLogStore>(&mut self, tracker: &mut Tracker<S>, line: &str) {
        self.summary.lines += 1;

        match parse_event_line(line, self.summary.lines) {
            Ok(Some(timed)) => {
                tracker.handle_timed(&timed).await;
                self.last_at = Some(self.last_at.map_or(timed.at, |prev| prev.max(timed.at)));
                self.summary.handled += 1;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Skipping malformed event");
                self.summary.skipped += 1;
            }
        }
    }

    /// Stops all open timers at the latest event instant and returns the
    /// counters. A stream without events ends at the current time.
    pub async fn finish<S: TimeLogStore>(mut self, tracker: &mut Tracker<S>) -> ReplaySummary {
        let end = self.last_at.unwrap_or_else(Utc::now);
        self.summary.sessions_logged = tracker.shutdown(end).await;
        self.summary.ended_at = Some(end);

        info!(
            lines = self.summary.lines,
            events = self.summary.handled,
            skipped = self.summary.skipped,
            sessions_logged = self.summary.sessions_logged,
            "Replay finished"
        );
        self.summary
    }
}

impl<S: TimeLogStore> Tracker<S> {
    /// Replays a JSON-lines event stream to its end, then flushes open timers.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Io`](crate::error::TrackerError::Io) when the
    /// stream cannot be read. Malformed lines are not errors.
    pub async fn replay<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> Result<ReplaySummary> {
        let mut lines = reader.lines();
        let mut replay = Replay::new();

        while let Some(line) = lines.next_line().await? {
            replay.feed_line(self, &line).await;
        }

        Ok(replay.finish(self).await)
    }
}
