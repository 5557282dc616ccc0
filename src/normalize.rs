//! Display normalization for extracted text.
//!
//! The verbatim text of a block is stored as extracted; this module derives
//! the companion normalized column from it.

use unicode_normalization::UnicodeNormalization;

/// Spaces that should read as an ordinary space after normalization.
const NON_BREAKING: [char; 3] = ['\u{00A0}', '\u{2007}', '\u{202F}'];

/// Normalize a verbatim text run for display.
///
/// Returns `None` when the input or the normalized result is empty.
pub fn normalize_text(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    let unified = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(&NON_BREAKING[..], " ");
    let composed: String = unified.nfc().collect();

    let lines: Vec<String> = composed.split('\n').map(collapse_line).collect();
    let joined = lines.join("\n");
    let result = joined.trim();

    if result.is_empty() {
        None
    } else {
        Some(result.to_string())
    }
}

/// Trim a single line and collapse runs of horizontal whitespace.
fn collapse_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for word in line.split(is_horizontal_space).filter(|w| !w.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn is_horizontal_space(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_are_none() {
        assert_eq!(normalize_text(""), None);
        assert_eq!(normalize_text(" \t\r\n\u{00A0} "), None);
    }

    #[test]
    fn collapses_whitespace_per_line() {
        assert_eq!(
            normalize_text("  如是  我聞 \t 一時\r\n\r\n  佛在\u{00A0}\u{00A0}舍衛國  "),
            Some("如是 我聞 一時\n\n佛在 舍衛國".to_string())
        );
    }

    #[test]
    fn lone_carriage_returns_become_line_feeds() {
        assert_eq!(normalize_text("a\rb"), Some("a\nb".to_string()));
    }

    #[test]
    fn composes_to_nfc() {
        // Hangul jamo sequence composes into a single syllable.
        let decomposed = "\u{1100}\u{1161}";
        assert_eq!(normalize_text(decomposed), Some("\u{AC00}".to_string()));
        assert_eq!(normalize_text("e\u{0301}"), Some("\u{00E9}".to_string()));
    }

    #[test]
    fn input_is_not_mutated() {
        let verbatim = String::from("  one  \n two ");
        let normalized = normalize_text(&verbatim);
        assert_eq!(verbatim, "  one  \n two ");
        assert_eq!(normalized.as_deref(), Some("one\ntwo"));
    }
}
