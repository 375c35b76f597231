//! Char-boundary-safe text helpers.

/// Returns at most `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Like [`truncate_chars`] but appends a marker when something was cut.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    let truncated = truncate_chars(text, max_chars);
    if truncated.len() < text.len() {
        format!("{truncated}\n[... truncated ...]")
    } else {
        truncated.to_string()
    }
}

/// Rough token estimate (4 chars per token) for text without a stored count.
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as u32).div_ceil(4)
}
