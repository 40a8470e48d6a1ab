//! Configuration module for the Watchtime tracker.
//!
//! The tracked hostnames and the minimum loggable duration are fixed at
//! compile time. Only the location of the persisted time log is read from
//! environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `WATCHTIME_DATA_DIR` | No | `~/.watchtime` | Directory holding the time log record |
//! | `WATCHTIME_STORE_FILE` | No | `time_log.json` | File name of the time log record |
//!
//! # Example
//!
//! ```no_run
//! use watchtime_tracker::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Time log: {}", config.store_path().display());
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::BaseDirs;
use thiserror::Error;

/// Hostnames whose pages are subject to time tracking.
///
/// A page is tracked when its hostname contains one of these entries.
pub const TARGET_HOSTS: &[&str] = &["www.crunchyroll.com", "www.netflix.com", "www.hidive.com"];

/// Sessions shorter than this are discarded unless the flush is forced.
pub const MIN_LOG_DURATION: Duration = Duration::from_secs(5 * 60);

/// Name of the persisted record holding the time log.
///
/// [`FileStore`](crate::storage::FileStore) writes the log under this key of
/// its JSON document.
pub const TIME_LOG_KEY: &str = "timeLog";

/// Default data directory name relative to home.
const DEFAULT_DATA_DIR: &str = ".watchtime";

/// Default file name of the time log record.
const DEFAULT_STORE_FILE: &str = "time_log.json";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,
}

/// Runtime configuration for the Watchtime tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the persisted time log.
    pub data_dir: PathBuf,

    /// File name of the time log record inside `data_dir`.
    pub store_file: String,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `WATCHTIME_DATA_DIR` or `WATCHTIME_STORE_FILE` is set but empty
    /// - `WATCHTIME_STORE_FILE` contains a path separator
    /// - The home directory cannot be determined and `WATCHTIME_DATA_DIR` is unset
    pub fn from_env() -> Result<Self, ConfigError> {
        // Optional: WATCHTIME_DATA_DIR (default: ~/.watchtime)
        let data_dir = match env::var("WATCHTIME_DATA_DIR") {
            Ok(val) => {
                if val.trim().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: "WATCHTIME_DATA_DIR".to_string(),
                        message: "data directory cannot be empty".to_string(),
                    });
                }
                PathBuf::from(val)
            }
            Err(_) => {
                let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
                base_dirs.home_dir().join(DEFAULT_DATA_DIR)
            }
        };

        // Optional: WATCHTIME_STORE_FILE (default: time_log.json)
        let store_file = match env::var("WATCHTIME_STORE_FILE") {
            Ok(val) => {
                let val = val.trim().to_string();
                if val.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: "WATCHTIME_STORE_FILE".to_string(),
                        message: "file name cannot be empty".to_string(),
                    });
                }
                if val.contains('/') || val.contains('\\') {
                    return Err(ConfigError::InvalidValue {
                        key: "WATCHTIME_STORE_FILE".to_string(),
                        message: format!("expected a bare file name, got '{val}'"),
                    });
                }
                val
            }
            Err(_) => DEFAULT_STORE_FILE.to_string(),
        };

        Ok(Self {
            data_dir,
            store_file,
        })
    }

    /// Full path of the time log record.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file)
    }
}
