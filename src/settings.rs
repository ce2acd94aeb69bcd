//! Text rendering of the pipeline settings.

use crate::config::{SettingsStore, CATEGORY_KEY, FEED_URLS_KEY, KEYWORDS_KEY};
use std::fmt::Write;

/// Form fields in display order: (key, label, default).
pub const SETTINGS_FIELDS: [(&str, &str, &str); 3] = [
    (FEED_URLS_KEY, "RSS Feed URLs (one per line)", ""),
    (KEYWORDS_KEY, "Keywords (comma-separated)", ""),
    (CATEGORY_KEY, "Default Post Category", "1"),
];

/// Renders each field label followed by its current value, indented.
///
/// Multi-line values keep one line per row; unset values show as `(not set)`.
pub fn render_settings_form(store: &dyn SettingsStore) -> String {
    let mut out = String::new();
    for (key, label, default) in SETTINGS_FIELDS {
        let value = store.get(key, default);
        let _ = writeln!(out, "{label}");

        let mut lines = value.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();
        if lines.peek().is_none() {
            out.push_str("  (not set)\n");
        }
        for line in lines {
            let _ = writeln!(out, "  {line}");
        }
        out.push('\n');
    }
    out
}
