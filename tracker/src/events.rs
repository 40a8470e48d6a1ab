//! Browser events consumed by the tracker.
//!
//! These mirror the tab and window notifications a browser delivers to an
//! extension background script. All types serialize to camelCase JSON with a
//! snake_case `type` tag, so a recorded event stream looks like:
//!
//! ```text
//! {"at":"2026-10-18T20:00:00Z","type":"tab_updated","tabId":1,"status":"complete","url":"https://www.netflix.com/watch/80107103","title":"Dark"}
//! {"at":"2026-10-18T20:06:00Z","type":"window_focus_changed","windowId":null}
//! {"at":"2026-10-18T20:16:00Z","type":"tab_removed","tabId":1}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::types::{TabId, WindowId};

/// Window id browsers report when no window has focus.
pub const WINDOW_ID_NONE: WindowId = -1;

/// Page load phase reported with a tab update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// The parts of a tab the tracker looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    pub tab_id: TabId,
    #[serde(default)]
    pub url: Option<String>,
}

/// A tab or window notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BrowserEvent {
    /// A tab started or finished loading, or changed URL/title.
    TabUpdated {
        tab_id: TabId,
        #[serde(default)]
        status: Option<LoadStatus>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    /// A tab was closed.
    TabRemoved { tab_id: TabId },
    /// The active tab of a window changed.
    TabActivated {
        tab_id: TabId,
        #[serde(default)]
        previous_tab_id: Option<TabId>,
        /// URL of the newly active tab, when the browser could look it up.
        #[serde(default)]
        url: Option<String>,
    },
    /// Focus moved to another window, or away from the browser.
    WindowFocusChanged {
        #[serde(default)]
        window_id: Option<WindowId>,
        /// Active tab of the newly focused window.
        #[serde(default)]
        active_tab: Option<TabSnapshot>,
    },
}

impl BrowserEvent {
    /// Short name used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TabUpdated { .. } => "tab_updated",
            Self::TabRemoved { .. } => "tab_removed",
            Self::TabActivated { .. } => "tab_activated",
            Self::WindowFocusChanged { .. } => "window_focus_changed",
        }
    }
}

/// Returns the focused window, treating [`WINDOW_ID_NONE`] like `None`.
#[must_use]
pub fn focused_window(window_id: Option<WindowId>) -> Option<WindowId> {
    window_id.filter(|id| *id != WINDOW_ID_NONE)
}

/// A browser event with the instant it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: BrowserEvent,
}

/// Parses one line of a JSON-lines event stream.
///
/// Blank lines and lines starting with `#` are skipped.
///
/// # Errors
///
/// Returns [`TrackerError::Event`] with the 1-based line number when the line
/// is not a valid timed event.
///
/// # Example
///
/// ```
/// use watchtime_tracker::events::{parse_event_line, BrowserEvent};
///
/// let line = r#"{"at":"2026-10-18T20:00:00Z","type":"tab_removed","tabId":7}"#;
/// let event = parse_event_line(line, 1).unwrap().unwrap();
/// assert_eq!(event.event, BrowserEvent::TabRemoved { tab_id: 7 });
///
/// assert!(parse_event_line("# comment", 2).unwrap().is_none());
/// assert!(parse_event_line("{}", 3).is_err());
/// ```
pub fn parse_event_line(line: &str, line_no: usize) -> Result<Option<TimedEvent>, TrackerError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| TrackerError::Event {
            line: line_no,
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tab_updated_from_json() {
        let json = r#"{"type":"tab_updated","tabId":3,"status":"complete","url":"https://www.netflix.com/watch/1","title":"Dark"}"#;
        let event: BrowserEvent = serde_json::from_str(json).unwrap();

        assert_eq!(
            event,
            BrowserEvent::TabUpdated {
                tab_id: 3,
                status: Some(LoadStatus::Complete),
                url: Some("https://www.netflix.com/watch/1".to_string()),
                title: Some("Dark".to_string()),
            }
        );
        assert_eq!(event.kind(), "tab_updated");
    }

    #[test]
    fn tab_updated_optional_fields_default() {
        let event: BrowserEvent =
            serde_json::from_str(r#"{"type":"tab_updated","tabId":3}"#).unwrap();
        assert_eq!(
            event,
            BrowserEvent::TabUpdated {
                tab_id: 3,
                status: None,
                url: None,
                title: None,
            }
        );
    }

    #[test]
    fn tab_activated_uses_camel_case_fields() {
        let event = BrowserEvent::TabActivated {
            tab_id: 2,
            previous_tab_id: Some(1),
            url: None,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "tab_activated");
        assert_eq!(json["tabId"], 2);
        assert_eq!(json["previousTabId"], 1);
    }

    #[test]
    fn window_focus_with_active_tab() {
        let json = r#"{"type":"window_focus_changed","windowId":5,"activeTab":{"tabId":9,"url":"https://www.hidive.com/tv/x"}}"#;
        let event: BrowserEvent = serde_json::from_str(json).unwrap();

        let BrowserEvent::WindowFocusChanged {
            window_id,
            active_tab,
        } = event
        else {
            panic!("expected window focus event");
        };
        assert_eq!(focused_window(window_id), Some(5));
        assert_eq!(active_tab.unwrap().tab_id, 9);
    }

    #[test]
    fn window_id_none_sentinel() {
        assert_eq!(focused_window(Some(WINDOW_ID_NONE)), None);
        assert_eq!(focused_window(None), None);
        assert_eq!(focused_window(Some(0)), Some(0));
    }

    #[test]
    fn timed_event_flattens_event_fields() {
        let timed = TimedEvent {
            at: Utc.with_ymd_and_hms(2026, 10, 18, 20, 0, 0).unwrap(),
            event: BrowserEvent::TabRemoved { tab_id: 4 },
        };
        let json = serde_json::to_value(&timed).unwrap();

        assert_eq!(json["type"], "tab_removed");
        assert_eq!(json["tabId"], 4);
        assert_eq!(json["at"], "2026-10-18T20:00:00Z");
    }

    #[test]
    fn parse_event_line_reports_line_number() {
        let err = parse_event_line(r#"{"at":"2026-10-18T20:00:00Z","type":"tab_moved"}"#, 12)
            .unwrap_err();
        assert!(matches!(err, TrackerError::Event { line: 12, .. }));
    }

    #[test]
    fn parse_event_line_skips_blank_lines() {
        assert!(parse_event_line("   ", 1).unwrap().is_none());
    }
}
