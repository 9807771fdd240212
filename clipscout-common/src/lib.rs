//! Common helpers shared across the clipscout crates.
//!
//! This crate stays dependency-light so every other crate can depend on it:
//!
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`snippet`]: bounded, char-boundary-safe text truncation for log fields
//!
//! # Examples
//!
//! ```rust
//! use clipscout_common::snippet;
//!
//! assert_eq!(snippet("short", 16), "short");
//! assert_eq!(snippet("abcdefgh", 4), "abcd…");
//! ```

pub mod observability;

/// Upper bound on concurrently requested pages per search.
pub const MAX_PAGES_LIMIT: usize = 20;

/// Truncate `text` to at most `max` bytes (on a char boundary) for logging.
///
/// A trailing `…` marks truncated values so log readers can tell a cut
/// snippet from a short one.
pub fn snippet(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut cut = max;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…", &text[..cut])
}
