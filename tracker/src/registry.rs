//! Per-tab timer registry.
//!
//! Each browser tab showing a tracked page owns at most one [`TimerEntry`].
//! An entry is either running (it has a start instant) or paused (time
//! accumulated so far is kept in the entry). Stopping a tab removes its entry
//! and hands back a [`FinishedSession`] for the time log.
//!
//! ```text
//!            start              pause
//!  Absent ─────────► Running ─────────► Paused
//!     ▲                 │   ◄─────────    │
//!     │                 │     resume      │
//!     └──── stop ───────┴───── stop ──────┘
//! ```
//!
//! All transitions take the event time explicitly so the registry never reads
//! the wall clock itself.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace};

use crate::time_log::qualifies_for_log;
use crate::types::{ShowIdentifier, TabId};

/// Observable state of a tab's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    /// No timer exists for the tab.
    Absent,
    /// The timer is counting.
    Running,
    /// The timer exists but is not counting.
    Paused,
}

/// Timer state for one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEntry {
    /// Show the elapsed time is attributed to.
    pub show: ShowIdentifier,

    /// Start of the current running stretch; `None` while paused.
    started_at: Option<DateTime<Utc>>,

    /// Time accumulated by earlier running stretches.
    accumulated: Duration,
}

impl TimerEntry {
    fn running(show: ShowIdentifier, now: DateTime<Utc>) -> Self {
        Self {
            show,
            started_at: Some(now),
            accumulated: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Time accumulated before the current running stretch.
    #[must_use]
    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Total time attributed to the entry as of `now`.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let current = self
            .started_at
            .map(|since| elapsed_between(since, now))
            .unwrap_or_default();
        self.accumulated.saturating_add(current)
    }
}

/// A stopped timer, ready to be written to the time log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedSession {
    pub tab_id: TabId,
    pub show: ShowIdentifier,
    /// Running time plus everything accumulated across pauses.
    pub duration: Duration,
    /// Set when the session ended because the tab closed; bypasses the
    /// minimum duration.
    pub forced: bool,
}

impl FinishedSession {
    /// Returns `true` when the session should be written to the time log.
    #[must_use]
    pub fn qualifies(&self) -> bool {
        qualifies_for_log(&self.show, self.duration, self.forced)
    }
}

/// Registry of tab timers, keyed by tab id.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: HashMap<TabId, TimerEntry>,
}

impl TimerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, tab_id: TabId) -> Option<&TimerEntry> {
        self.timers.get(&tab_id)
    }

    #[must_use]
    pub fn status(&self, tab_id: TabId) -> TimerStatus {
        match self.timers.get(&tab_id) {
            None => TimerStatus::Absent,
            Some(entry) if entry.is_running() => TimerStatus::Running,
            Some(_) => TimerStatus::Paused,
        }
    }

    /// Show currently attributed to the tab, if any.
    #[must_use]
    pub fn show(&self, tab_id: TabId) -> Option<&ShowIdentifier> {
        self.timers.get(&tab_id).map(|entry| &entry.show)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Ids of all tabs with a timer, in ascending order.
    #[must_use]
    pub fn tab_ids(&self) -> Vec<TabId> {
        let mut ids: Vec<TabId> = self.timers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Starts a fresh running timer for `show`.
    ///
    /// Any existing timer for the tab is stopped first (unforced) and returned
    /// so its time can be flushed. The accumulator starts from zero.
    pub fn start(
        &mut self,
        tab_id: TabId,
        show: ShowIdentifier,
        now: DateTime<Utc>,
    ) -> Option<FinishedSession> {
        let previous = self.stop(tab_id, now, false);

        info!(tab_id, show = %show, "Starting timer");
        self.timers.insert(tab_id, TimerEntry::running(show, now));

        previous
    }

    /// Moves a running timer to paused, banking the elapsed time.
    ///
    /// Returns `false` when the tab has no timer or it is already paused.
    pub fn pause(&mut self, tab_id: TabId, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.timers.get_mut(&tab_id) else {
            return false;
        };
        let Some(since) = entry.started_at.take() else {
            return false;
        };

        entry.accumulated = entry.accumulated.saturating_add(elapsed_between(since, now));
        debug!(
            tab_id,
            show = %entry.show,
            accumulated_ms = entry.accumulated.as_millis() as u64,
            "Paused timer"
        );
        true
    }

    /// Pauses every running timer. Returns the number of timers paused.
    pub fn pause_all(&mut self, now: DateTime<Utc>) -> usize {
        self.tab_ids()
            .into_iter()
            .filter(|tab_id| self.pause(*tab_id, now))
            .count()
    }

    /// Moves a paused timer back to running.
    ///
    /// Returns `false` when the tab has no timer or it is already running.
    pub fn resume(&mut self, tab_id: TabId, now: DateTime<Utc>) -> bool {
        match self.timers.get_mut(&tab_id) {
            Some(entry) if entry.started_at.is_none() => {
                entry.started_at = Some(now);
                debug!(tab_id, show = %entry.show, "Resumed timer");
                true
            }
            _ => false,
        }
    }

    /// Removes the tab's timer and returns the finished session.
    ///
    /// Returns `None` when the tab has no timer, so stopping twice is a no-op.
    pub fn stop(
        &mut self,
        tab_id: TabId,
        now: DateTime<Utc>,
        force: bool,
    ) -> Option<FinishedSession> {
        let entry = self.timers.remove(&tab_id)?;
        let session_ms = entry
            .started_at
            .map(|since| elapsed_between(since, now))
            .unwrap_or_default();
        let duration = entry.elapsed(now);

        info!(
            tab_id,
            show = %entry.show,
            session_ms = session_ms.as_millis() as u64,
            accumulated_ms = entry.accumulated.as_millis() as u64,
            total_ms = duration.as_millis() as u64,
            forced = force,
            "Stopping timer"
        );

        Some(FinishedSession {
            tab_id,
            show: entry.show,
            duration,
            forced: force,
        })
    }

    /// Stops every timer, returning the finished sessions in tab id order.
    pub fn stop_all(&mut self, now: DateTime<Utc>, force: bool) -> Vec<FinishedSession> {
        self.tab_ids()
            .into_iter()
            .filter_map(|tab_id| self.stop(tab_id, now, force))
            .collect()
    }
}

/// Wall-clock time between two instants, clamped at zero.
fn elapsed_between(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    match (now - since).to_std() {
        Ok(elapsed) => elapsed,
        Err(_) => {
            trace!(%since, %now, "Clock moved backwards, counting zero");
            Duration::ZERO
        }
    }
}
