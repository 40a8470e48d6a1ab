//! Show identifier resolution from page URLs and titles.
//!
//! Streaming sites expose the show in different places: Crunchyroll and HIDIVE
//! put a series slug in the path, Netflix only a numeric title id. When the URL
//! says nothing useful the page title is cleaned up heuristically instead.
//!
//! # URL Patterns
//!
//! | Site | Path | Identifier |
//! |------|------|------------|
//! | Crunchyroll | `/series/<id>/<slug>` | `<slug>`, or `<id>` when the slug is missing |
//! | Netflix | `/watch/<id>` | `netflix-<id>` |
//! | HIDIVE | `/tv/<slug>`, `/stream/<slug>/...` | `<slug>` |
//!
//! # Example
//!
//! ```
//! use watchtime_tracker::identifier::resolve;
//!
//! let show = resolve("https://www.crunchyroll.com/series/GRMG8ZQZR/one-piece", None);
//! assert_eq!(show.as_str(), "one-piece");
//!
//! let show = resolve(
//!     "https://www.hidive.com/search",
//!     Some("Watch Oshi no Ko Season 2 Episode 4 (English Dub) | HIDIVE"),
//! );
//! assert_eq!(show.as_str(), "oshi-no-ko");
//!
//! let show = resolve("https://www.netflix.com/browse", Some("   "));
//! assert!(show.is_unknown());
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;
use url::Url;

use crate::config::TARGET_HOSTS;
use crate::types::ShowIdentifier;

/// Title separators; only the text before the first one is kept.
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-–—|]").expect("separator pattern is valid"));

/// "Watch", "Season N" and "Episode N" markers.
static EPISODE_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bwatch\s+|\s*\bseason\s+\d+|\s*\bepisode\s+\d+")
        .expect("episode noise pattern is valid")
});

/// Dub markers such as `(English Dub)`.
static DUB_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(\w+\s+dub\)").expect("dub marker pattern is valid"));

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("parenthetical pattern is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Resolves the show identifier for a page.
///
/// Site-specific URL patterns take priority. When the URL yields nothing
/// (including when it cannot be parsed at all) the title heuristic runs. The
/// result is lowercased with whitespace runs collapsed to `-`.
///
/// # Arguments
///
/// * `url` - The page URL as reported by the browser
/// * `title` - The page title, if the browser reported one
///
/// # Returns
///
/// The normalized identifier, or [`ShowIdentifier::unknown`] when neither the
/// URL nor the title produced anything usable.
///
/// # Examples
///
/// ```
/// use watchtime_tracker::identifier::resolve;
///
/// assert_eq!(
///     resolve("https://www.netflix.com/watch/80107103?trackId=1", None).as_str(),
///     "netflix-80107103"
/// );
/// assert!(resolve("https://www.netflix.com/browse", None).is_unknown());
/// ```
#[must_use]
pub fn resolve(url: &str, title: Option<&str>) -> ShowIdentifier {
    let from_url = match Url::parse(url) {
        Ok(parsed) => identifier_from_url(&parsed),
        Err(e) => {
            trace!(url, error = %e, "Unparseable page URL, falling back to title");
            None
        }
    };

    let raw = from_url.or_else(|| title.and_then(identifier_from_title));

    match raw.map(|r| normalize(&r)) {
        Some(normalized) if !normalized.is_empty() => ShowIdentifier::new(normalized),
        _ => ShowIdentifier::unknown(),
    }
}

/// Returns `true` when the URL belongs to one of the tracked streaming sites.
///
/// Unparseable URLs and URLs without a host are never tracked.
///
/// # Examples
///
/// ```
/// use watchtime_tracker::identifier::is_tracked_url;
///
/// assert!(is_tracked_url("https://www.crunchyroll.com/watch/G4VUQ1ZKW"));
/// assert!(!is_tracked_url("https://example.com/series/x/y"));
/// assert!(!is_tracked_url("not a url"));
/// ```
#[must_use]
pub fn is_tracked_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(is_tracked_host))
        .unwrap_or(false)
}

/// Returns `true` when the hostname contains a tracked hostname.
#[must_use]
pub fn is_tracked_host(host: &str) -> bool {
    TARGET_HOSTS.iter().any(|target| host.contains(target))
}

fn identifier_from_url(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let segments: Vec<&str> = url.path_segments()?.collect();

    if host.contains("crunchyroll.com") {
        let series = segments.iter().position(|s| *s == "series")?;
        let slug = segments
            .get(series + 2)
            .map(|s| sanitize_slug(s))
            .filter(|s| !s.is_empty());
        return slug.or_else(|| {
            segments
                .get(series + 1)
                .filter(|id| !id.is_empty())
                .map(|id| (*id).to_string())
        });
    }

    if host.contains("netflix.com") {
        if segments.first() != Some(&"watch") {
            return None;
        }
        return segments
            .get(1)
            .filter(|id| !id.is_empty())
            .map(|id| format!("Netflix-{id}"));
    }

    if host.contains("hidive.com") {
        if !matches!(segments.first(), Some(&"tv") | Some(&"stream")) {
            return None;
        }
        return segments
            .get(1)
            .map(|s| sanitize_slug(s))
            .filter(|s| !s.is_empty());
    }

    None
}

fn identifier_from_title(title: &str) -> Option<String> {
    let head = SEPARATOR.split(title).next().unwrap_or_default();
    let cleaned = EPISODE_NOISE.replace_all(head, "");
    let cleaned = DUB_MARKER.replace_all(&cleaned, "");
    let cleaned = PARENTHETICAL.replace_all(&cleaned, "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Replaces every character outside `[A-Za-z0-9-]` with `-`.
fn sanitize_slug(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

fn normalize(raw: &str) -> String {
    WHITESPACE
        .replace_all(&raw.to_lowercase(), "-")
        .into_owned()
}
