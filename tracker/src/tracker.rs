//! Event-driven coordinator tying the registry, the resolver and the time log
//! together.
//!
//! The [`Tracker`] owns all per-tab state. Each browser event is handed to one
//! handler which runs to completion; handlers borrow the tracker mutably, so
//! events are processed strictly one after another and the time log's
//! read-modify-write never interleaves with another handler in this process.
//!
//! # Event Handling
//!
//! | Event | Effect |
//! |-------|--------|
//! | Tab finished loading a tracked page | start (new show) or resume (same show) |
//! | Tab finished loading an untracked page | stop and flush |
//! | Tab started loading | pause |
//! | Tab closed | stop and flush, bypassing the minimum duration |
//! | Tab activated | pause the previous tab, resume the new one if tracked |
//! | Browser lost focus | pause every timer |
//! | Window gained focus | resume its active tab if tracked |

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace};

use crate::events::{focused_window, BrowserEvent, LoadStatus, TabSnapshot, TimedEvent};
use crate::identifier::{is_tracked_url, resolve};
use crate::registry::{FinishedSession, TimerRegistry, TimerStatus};
use crate::storage::TimeLogStore;
use crate::time_log::TimeLogWriter;
use crate::types::{TabId, WindowId};

/// Watch-time tracker for one browser profile.
#[derive(Debug)]
pub struct Tracker<S> {
    registry: TimerRegistry,
    writer: TimeLogWriter<S>,
}

impl<S: TimeLogStore> Tracker<S> {
    /// Creates a tracker persisting into `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            registry: TimerRegistry::new(),
            writer: TimeLogWriter::new(store),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &TimerRegistry {
        &self.registry
    }

    #[must_use]
    pub fn writer(&self) -> &TimeLogWriter<S> {
        &self.writer
    }

    /// Dispatches a timed event to its handler.
    pub async fn handle_timed(&mut self, timed: &TimedEvent) {
        self.handle(&timed.event, timed.at).await;
    }

    /// Dispatches `event`, which happened at `at`, to its handler.
    pub async fn handle(&mut self, event: &BrowserEvent, at: DateTime<Utc>) {
        trace!(kind = event.kind(), %at, "Handling browser event");

        match event {
            BrowserEvent::TabUpdated {
                tab_id,
                status,
                url,
                title,
            } => {
                self.on_tab_updated(*tab_id, *status, url.as_deref(), title.as_deref(), at)
                    .await;
            }
            BrowserEvent::TabRemoved { tab_id } => self.on_tab_removed(*tab_id, at).await,
            BrowserEvent::TabActivated {
                tab_id,
                previous_tab_id,
                url,
            } => self.on_tab_activated(*tab_id, *previous_tab_id, url.as_deref(), at),
            BrowserEvent::WindowFocusChanged {
                window_id,
                active_tab,
            } => self.on_window_focus_changed(*window_id, active_tab.as_ref(), at),
        }
    }

    /// Handles a tab update (navigation or load progress).
    pub async fn on_tab_updated(
        &mut self,
        tab_id: TabId,
        status: Option<LoadStatus>,
        url: Option<&str>,
        title: Option<&str>,
        at: DateTime<Utc>,
    ) {
        match (status, url) {
            (Some(LoadStatus::Complete), Some(url)) => {
                if !is_tracked_url(url) {
                    // Navigated away from a tracked site within the same tab
                    let finished = self.registry.stop(tab_id, at, false);
                    self.flush(finished).await;
                    return;
                }

                let show = resolve(url, title);
                let same_show = self.registry.show(tab_id) == Some(&show);

                if !same_show {
                    let previous = self.registry.start(tab_id, show, at);
                    self.flush(previous).await;
                } else if self.registry.status(tab_id) == TimerStatus::Paused {
                    self.registry.resume(tab_id, at);
                }
            }
            (Some(LoadStatus::Loading), _) => {
                // Pause right away: the page may be replaced before it completes
                self.registry.pause(tab_id, at);
            }
            _ => {}
        }
    }

    /// Handles a closed tab. Its time is flushed even below the minimum.
    pub async fn on_tab_removed(&mut self, tab_id: TabId, at: DateTime<Utc>) {
        let finished = self.registry.stop(tab_id, at, true);
        self.flush(finished).await;
    }

    /// Handles a change of the active tab.
    ///
    /// `url` is the URL of the newly active tab, if known.
    pub fn on_tab_activated(
        &mut self,
        tab_id: TabId,
        previous_tab_id: Option<TabId>,
        url: Option<&str>,
        at: DateTime<Utc>,
    ) {
        if let Some(previous) = previous_tab_id {
            self.registry.pause(previous, at);
        }

        if url.is_some_and(is_tracked_url) {
            self.registry.resume(tab_id, at);
        }
    }

    /// Handles window focus moving to `window_id`, or away from the browser
    /// when it is `None` or [`WINDOW_ID_NONE`](crate::events::WINDOW_ID_NONE).
    pub fn on_window_focus_changed(
        &mut self,
        window_id: Option<WindowId>,
        active_tab: Option<&TabSnapshot>,
        at: DateTime<Utc>,
    ) {
        let Some(window_id) = focused_window(window_id) else {
            let paused = self.registry.pause_all(at);
            info!(paused, "Browser lost focus, pausing all timers");
            return;
        };

        let Some(tab) = active_tab else {
            debug!(window_id, "Focused window has no known active tab");
            return;
        };

        if tab.url.as_deref().is_some_and(is_tracked_url) {
            self.registry.resume(tab.tab_id, at);
        }
    }

    /// Stops every timer as if all tabs were closed, flushing their time.
    ///
    /// Returns the number of sessions written to the time log.
    pub async fn shutdown(&mut self, at: DateTime<Utc>) -> usize {
        let finished = self.registry.stop_all(at, true);
        let mut logged = 0;
        for session in &finished {
            if self.writer.record_session(session).await {
                logged += 1;
            }
        }
        info!(stopped = finished.len(), logged, "Tracker shut down");
        logged
    }

    async fn flush(&self, finished: Option<FinishedSession>) {
        if let Some(session) = finished {
            self.writer.record_session(&session).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};
    use crate::time_log::TimeLog;
    use crate::types::ShowIdentifier;
    use chrono::TimeZone;

    const CR_ONE_PIECE: &str = "https://www.crunchyroll.com/series/GRMG8ZQZR/one-piece";
    const CR_FRIEREN: &str = "https://www.crunchyroll.com/series/GG5H5XQX4/frieren";
    const ELSEWHERE: &str = "https://www.example.com/";

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 20, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
    }

    fn logged(store: &MemoryStore, show: &str) -> u64 {
        store
            .snapshot()
            .map(|log| log.get(&ShowIdentifier::new(show)))
            .unwrap_or(0)
    }

    /// Store that rejects every read and write.
    struct FailingStore;

    impl TimeLogStore for FailingStore {
        async fn get(&self) -> Result<Option<TimeLog>, StorageError> {
            Err(StorageError::Unavailable("store offline".to_string()))
        }

        async fn set(&self, _log: &TimeLog) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("store offline".to_string()))
        }

        async fn remove(&self) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("store offline".to_string()))
        }
    }

    async fn load<S: TimeLogStore>(tracker: &mut Tracker<S>, tab: TabId, url: &str, minute: i64) {
        tracker
            .on_tab_updated(tab, Some(LoadStatus::Complete), Some(url), None, at(minute))
            .await;
    }

    #[tokio::test]
    async fn loading_tracked_page_starts_timer() {
        let mut tracker = Tracker::new(MemoryStore::new());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;

        assert_eq!(tracker.registry().status(1), TimerStatus::Running);
        assert_eq!(
            tracker.registry().show(1),
            Some(&ShowIdentifier::new("one-piece"))
        );
    }

    #[tokio::test]
    async fn reloading_same_show_keeps_timer() {
        let mut tracker = Tracker::new(MemoryStore::new());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;
        load(&mut tracker, 1, CR_ONE_PIECE, 3).await;

        let entry = tracker.registry().get(1).unwrap();
        assert_eq!(entry.started_at(), Some(at(0)));
    }

    #[tokio::test]
    async fn loading_event_pauses_and_completion_resumes() {
        let store = MemoryStore::new();
        let mut tracker = Tracker::new(store.clone());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;

        tracker
            .on_tab_updated(1, Some(LoadStatus::Loading), None, None, at(4))
            .await;
        assert_eq!(tracker.registry().status(1), TimerStatus::Paused);

        load(&mut tracker, 1, CR_ONE_PIECE, 5).await;
        assert_eq!(tracker.registry().status(1), TimerStatus::Running);

        tracker.on_tab_removed(1, at(7)).await;
        assert_eq!(logged(&store, "one-piece"), 6 * 60_000);
    }

    #[tokio::test]
    async fn show_change_stops_then_starts() {
        let store = MemoryStore::new();
        let mut tracker = Tracker::new(store.clone());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;
        load(&mut tracker, 1, CR_FRIEREN, 8).await;

        assert_eq!(logged(&store, "one-piece"), 8 * 60_000);
        assert_eq!(
            tracker.registry().show(1),
            Some(&ShowIdentifier::new("frieren"))
        );
        assert_eq!(tracker.registry().get(1).unwrap().started_at(), Some(at(8)));
    }

    #[tokio::test]
    async fn show_change_below_threshold_is_not_logged() {
        let store = MemoryStore::new();
        let mut tracker = Tracker::new(store.clone());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;
        load(&mut tracker, 1, CR_FRIEREN, 2).await;

        assert!(store.snapshot().is_none());
    }

    #[tokio::test]
    async fn navigating_to_untracked_site_stops_timer() {
        let mut tracker = Tracker::new(MemoryStore::new());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;
        load(&mut tracker, 1, ELSEWHERE, 6).await;

        assert_eq!(tracker.registry().status(1), TimerStatus::Absent);
    }

    #[tokio::test]
    async fn update_without_status_or_url_is_ignored() {
        let mut tracker = Tracker::new(MemoryStore::new());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;

        tracker
            .on_tab_updated(1, None, None, Some("New title"), at(1))
            .await;
        tracker
            .on_tab_updated(1, Some(LoadStatus::Complete), None, None, at(2))
            .await;
        assert_eq!(tracker.registry().status(1), TimerStatus::Running);
    }

    #[tokio::test]
    async fn loading_untracked_tab_does_nothing() {
        let mut tracker = Tracker::new(MemoryStore::new());
        tracker
            .on_tab_updated(2, Some(LoadStatus::Loading), Some(ELSEWHERE), None, at(0))
            .await;
        assert!(tracker.registry().is_empty());
    }

    #[tokio::test]
    async fn tab_activation_pauses_previous_and_resumes_current() {
        let mut tracker = Tracker::new(MemoryStore::new());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;
        load(&mut tracker, 2, CR_FRIEREN, 0).await;

        tracker.on_tab_activated(2, Some(1), Some(CR_FRIEREN), at(1));
        assert_eq!(tracker.registry().status(1), TimerStatus::Paused);
        assert_eq!(tracker.registry().status(2), TimerStatus::Running);

        tracker.on_tab_activated(1, Some(2), Some(CR_ONE_PIECE), at(3));
        assert_eq!(tracker.registry().status(1), TimerStatus::Running);
        assert_eq!(tracker.registry().status(2), TimerStatus::Paused);
    }

    #[tokio::test]
    async fn tab_activation_on_untracked_url_does_not_resume() {
        let mut tracker = Tracker::new(MemoryStore::new());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;
        tracker.on_tab_activated(2, Some(1), None, at(1));

        tracker.on_tab_activated(1, Some(2), Some(ELSEWHERE), at(2));
        assert_eq!(tracker.registry().status(1), TimerStatus::Paused);
    }

    #[tokio::test]
    async fn window_focus_loss_pauses_everything() {
        let mut tracker = Tracker::new(MemoryStore::new());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;
        load(&mut tracker, 2, CR_FRIEREN, 0).await;

        tracker.on_window_focus_changed(None, None, at(1));
        assert_eq!(tracker.registry().status(1), TimerStatus::Paused);
        assert_eq!(tracker.registry().status(2), TimerStatus::Paused);
    }

    #[tokio::test]
    async fn window_focus_gain_resumes_active_tab_only() {
        let mut tracker = Tracker::new(MemoryStore::new());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;
        load(&mut tracker, 2, CR_FRIEREN, 0).await;
        tracker.on_window_focus_changed(Some(crate::events::WINDOW_ID_NONE), None, at(1));

        let active = TabSnapshot {
            tab_id: 2,
            url: Some(CR_FRIEREN.to_string()),
        };
        tracker.on_window_focus_changed(Some(10), Some(&active), at(2));

        assert_eq!(tracker.registry().status(1), TimerStatus::Paused);
        assert_eq!(tracker.registry().status(2), TimerStatus::Running);
    }

    #[tokio::test]
    async fn tab_removed_twice_logs_once() {
        let store = MemoryStore::new();
        let mut tracker = Tracker::new(store.clone());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;

        tracker.on_tab_removed(1, at(6)).await;
        tracker.on_tab_removed(1, at(9)).await;

        assert_eq!(logged(&store, "one-piece"), 6 * 60_000);
    }

    #[tokio::test]
    async fn unknown_show_is_timed_but_never_logged() {
        let store = MemoryStore::new();
        let mut tracker = Tracker::new(store.clone());
        load(&mut tracker, 1, "https://www.netflix.com/browse", 0).await;

        assert_eq!(tracker.registry().status(1), TimerStatus::Running);
        assert!(tracker.registry().show(1).unwrap().is_unknown());

        tracker.on_tab_removed(1, at(30)).await;
        assert!(store.snapshot().is_none());
    }

    #[tokio::test]
    async fn handle_dispatches_browser_events() {
        let store = MemoryStore::new();
        let mut tracker = Tracker::new(store.clone());

        let open = BrowserEvent::TabUpdated {
            tab_id: 5,
            status: Some(LoadStatus::Complete),
            url: Some("https://www.netflix.com/watch/80107103".to_string()),
            title: Some("Dark | Netflix".to_string()),
        };
        tracker.handle(&open, at(0)).await;
        tracker
            .handle(&BrowserEvent::TabRemoved { tab_id: 5 }, at(2))
            .await;

        assert_eq!(logged(&store, "netflix-80107103"), 2 * 60_000);
    }

    #[tokio::test]
    async fn shutdown_flushes_all_timers() {
        let store = MemoryStore::new();
        let mut tracker = Tracker::new(store.clone());
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;
        load(&mut tracker, 2, CR_FRIEREN, 0).await;
        load(&mut tracker, 3, "https://www.netflix.com/browse", 0).await;

        assert_eq!(tracker.shutdown(at(2)).await, 2);
        assert!(tracker.registry().is_empty());
        assert_eq!(logged(&store, "one-piece"), 2 * 60_000);
        assert_eq!(logged(&store, "frieren"), 2 * 60_000);
    }

    #[tokio::test]
    async fn tab_removed_with_failing_store_still_stops_timer() {
        let mut tracker = Tracker::new(FailingStore);
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;
        load(&mut tracker, 2, CR_FRIEREN, 0).await;

        tracker.on_tab_removed(1, at(10)).await;

        assert_eq!(tracker.registry().status(1), TimerStatus::Absent);
        assert_eq!(tracker.registry().status(2), TimerStatus::Running);
    }

    #[tokio::test]
    async fn shutdown_with_failing_store_reports_nothing_logged() {
        let mut tracker = Tracker::new(FailingStore);
        load(&mut tracker, 1, CR_ONE_PIECE, 0).await;

        assert_eq!(tracker.shutdown(at(20)).await, 0);
        assert!(tracker.registry().is_empty());
    }
}
