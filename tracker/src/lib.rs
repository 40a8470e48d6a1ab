//! Watchtime Tracker - per-tab streaming watch-time accounting.
//!
//! This crate measures how long a user watches shows on streaming sites. Browser
//! tab and window events drive a per-tab timer; when a timer stops, the elapsed
//! time is attributed to a show identifier and added to a persisted time log.
//!
//! # Overview
//!
//! A tab that finishes loading a page on a tracked site gets a running timer for
//! the show resolved from the page URL or title. Losing focus (tab switch,
//! browser in the background, page starting to load) pauses the timer; regaining
//! focus resumes it. Navigating elsewhere or closing the tab stops it, and
//! sessions long enough (or ended by closing the tab) are logged.
//!
//! # Modules
//!
//! - [`types`]: Tab/window ids and the show identifier type
//! - [`identifier`]: Show identifier resolution from URLs and titles
//! - [`registry`]: Per-tab timer state machine
//! - [`time_log`]: Persisted time log and its writer
//! - [`storage`]: Record stores (in-memory and JSON file)
//! - [`events`]: Browser event types and JSON-lines parsing
//! - [`tracker`]: Event-driven coordinator
//! - [`replay`]: JSON-lines event stream replay
//! - [`display`]: Duration formatting and log rendering
//! - [`config`]: Fixed tracking constants and environment configuration
//! - [`error`]: Error types for tracker operations

pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod identifier;
pub mod registry;
pub mod replay;
pub mod storage;
pub mod time_log;
pub mod tracker;
pub mod types;

pub use config::{Config, MIN_LOG_DURATION, TARGET_HOSTS};
pub use display::{format_duration, LogView};
pub use error::{Result, TrackerError};
pub use events::{BrowserEvent, LoadStatus, TabSnapshot, TimedEvent};
pub use identifier::{is_tracked_url, resolve};
pub use registry::{FinishedSession, TimerRegistry, TimerStatus};
pub use replay::{Replay, ReplaySummary};
pub use storage::{FileStore, MemoryStore, StorageError, TimeLogStore};
pub use time_log::{TimeLog, TimeLogWriter};
pub use tracker::Tracker;
pub use types::{ShowIdentifier, TabId, WindowId};
