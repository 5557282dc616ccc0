//! Metadata header extraction.

use regex::Regex;
use std::sync::OnceLock;

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<teiHeader\b.*?</teiHeader\s*>").expect("header pattern is valid")
    })
}

/// Return the first `<teiHeader>…</teiHeader>` block verbatim, if any.
pub fn extract_header(text: &str) -> Option<&str> {
    header_pattern().find(text).map(|m| m.as_str())
}
