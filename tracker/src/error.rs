//! Error types for the Watchtime tracker.
//!
//! Store operations report [`StorageError`](crate::storage::StorageError) and
//! configuration reports [`ConfigError`](crate::config::ConfigError). This
//! module covers reading and decoding browser event streams.

use thiserror::Error;

/// Errors that can occur while reading browser events.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The event stream could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A browser event could not be decoded.
    #[error("event error: line {line}: {message}")]
    Event { line: usize, message: String },
}

/// A specialized `Result` type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
