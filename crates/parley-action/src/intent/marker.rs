//! Explicit `[ACTION: <intent>]` markers embedded by the dialogue generator.

use std::sync::LazyLock;

use parley_core::types::IntentKind;
use regex::Regex;
use tracing::warn;

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\s*action\s*:\s*([a-z_]+)\s*\]").expect("Invalid marker regex")
});

/// A recognised marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Intent(IntentKind),
    /// `[ACTION: none]`: the generator says nothing should happen.
    NoAction,
}

/// Find the first recognised marker in `text`.
///
/// Markers naming an unknown intent are logged and skipped.
pub fn parse_marker(text: &str) -> Option<Marker> {
    for caps in MARKER_RE.captures_iter(text) {
        let name = caps[1].to_lowercase();
        if name == "none" {
            return Some(Marker::NoAction);
        }
        match name.parse::<IntentKind>() {
            Ok(kind) => return Some(Marker::Intent(kind)),
            Err(_) => warn!(marker = %name, "Ignoring unknown action marker"),
        }
    }
    None
}

/// Remove every marker token, leaving text suitable for display.
pub fn strip_markers(text: &str) -> String {
    let stripped = MARKER_RE.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
