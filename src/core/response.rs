//! Discord message text utilities
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Add markdown escaping for user-provided text
//! - 1.0.0: Message limit truncation

/// Discord message content limit (characters)
pub const MESSAGE_LIMIT: usize = 2000;

/// Truncate text to fit the message limit, cutting at a line break when one
/// is close to the limit
pub fn truncate_for_message(text: &str) -> String {
    if text.chars().count() <= MESSAGE_LIMIT {
        return text.to_string();
    }

    let budget = MESSAGE_LIMIT - 2; // room for "\n…"
    let end = text
        .char_indices()
        .nth(budget)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let head = &text[..end];

    let cut = match head.rfind('\n') {
        Some(newline) if newline > end / 2 => newline,
        _ => end,
    };
    format!("{}\n…", head[..cut].trim_end())
}

/// Escape Discord markdown control characters in user-provided text
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '*' | '_' | '~' | '`' | '|' | '>') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
