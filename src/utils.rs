//! Text normalization helpers shared by transcript collaborators.

use regex::Regex;
use std::sync::LazyLock;

static SELF_CLOSING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+/>").expect("self-closing tag pattern is valid"));
static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("markup tag pattern is valid"));

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Remove annotation markup, keeping the text it wraps.
///
/// Self-closing tags (`<UNIN/>`) vanish; paired tags
/// (`<UNSURE>word</UNSURE>`) leave `word`. Whitespace is normalized afterwards.
pub fn strip_markup_tags(text: &str) -> String {
    let stripped = SELF_CLOSING_TAG.replace_all(text, "");
    // Dropping open and close tags separately leaves paired-tag content in place.
    let stripped = MARKUP_TAG.replace_all(&stripped, "");
    normalize_inline_whitespace(stripped)
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
