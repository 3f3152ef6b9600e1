//! Conversation-title hygiene: generic-title detection and sanitization.
//!
//! A conversation keeps its placeholder title until the first successful
//! turn, at which point the assembler rewrites it — but only while the
//! current title is still generic.  Model-produced titles pass through
//! [`sanitize_title`] before being written back.

/// Hard cap on stored title length, in characters.
pub const TITLE_MAX_CHARS: usize = 60;

/// Placeholder titles eligible for automatic replacement (compared
/// case-insensitively after trimming).
const GENERIC_TITLES: [&str; 2] = ["new chat", "new conversation"];

/// Quote characters stripped from the ends of a generated title.
const QUOTE_CHARS: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

fn is_wrapping(c: char) -> bool {
    c.is_whitespace() || QUOTE_CHARS.contains(&c)
}

// ---------------------------------------------------------------------------
// is_generic_title
// ---------------------------------------------------------------------------

/// Returns `true` when `title` is empty or one of the known placeholders,
/// ignoring surrounding whitespace and letter case.
///
/// ```rust
/// use tivivu_voice::chat::is_generic_title;
///
/// assert!(is_generic_title(""));
/// assert!(is_generic_title("  New Conversation "));
/// assert!(is_generic_title("NEW CHAT"));
/// assert!(!is_generic_title("Ordering Coffee Practice"));
/// ```
pub fn is_generic_title(title: &str) -> bool {
    let t = title.trim().to_lowercase();
    t.is_empty() || GENERIC_TITLES.contains(&t.as_str())
}

// ---------------------------------------------------------------------------
// sanitize_title
// ---------------------------------------------------------------------------

/// Clean up a model-generated title before storing it.
///
/// * collapses all whitespace runs (including newlines) to single spaces,
/// * strips wrapping quote characters,
/// * caps the result at [`TITLE_MAX_CHARS`] characters,
/// * falls back to `"Conversation"` when nothing is left.
///
/// Sanitizing an already-sanitized string returns it unchanged.
pub fn sanitize_title(raw: &str) -> String {
    // Collapse whitespace runs (incl. \r\n) and trim the ends in one pass.
    let collapsed: String = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut s = collapsed.trim_matches(is_wrapping).to_string();

    if s.chars().count() > TITLE_MAX_CHARS {
        s = s.chars().take(TITLE_MAX_CHARS).collect();
        // Truncation may expose whitespace or a quote at the new end.
        s = s.trim_end_matches(is_wrapping).to_string();
    }

    if s.is_empty() {
        return "Conversation".to_string();
    }
    s
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
