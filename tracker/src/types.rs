//! Core value types shared across the tracker.
//!
//! Browser tab and window ids are plain integers on the wire; show identifiers
//! are normalized strings used as keys in the persisted time log.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier the sentinel show resolves to when nothing usable was found.
pub const UNKNOWN_SHOW: &str = "unknown-show";

/// Browser tab identifier.
pub type TabId = i64;

/// Browser window identifier.
pub type WindowId = i64;

/// A normalized show identifier (lowercase, hyphen-separated).
///
/// The sentinel value [`UNKNOWN_SHOW`] marks a page whose show could not be
/// resolved; sessions attributed to it are never written to the time log.
///
/// # Examples
///
/// ```
/// use watchtime_tracker::types::ShowIdentifier;
///
/// let show = ShowIdentifier::new("one-piece");
/// assert_eq!(show.as_str(), "one-piece");
/// assert!(!show.is_unknown());
///
/// assert!(ShowIdentifier::unknown().is_unknown());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowIdentifier(String);

impl ShowIdentifier {
    /// Wraps an already-normalized identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The sentinel identifier.
    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN_SHOW.to_string())
    }

    /// Returns `true` for the sentinel identifier.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_SHOW
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ShowIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShowIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ShowIdentifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ShowIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
