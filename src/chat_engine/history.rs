use super::types::Message;

/// Rough content-unit approximation: one token ~= 4 characters.
pub const CHARS_PER_TOKEN: usize = 4;

/// Fixed safety margin subtracted from the budget, in characters.
const SAFETY_BUFFER_CHARS: usize = 1000;

/// Selects the suffix of `history` that fits the context budget left over
/// after the system context and the reserved output window.
///
/// The budget is a soft target: a non-empty history always yields at least
/// the most recent message, even when that message alone exceeds the budget,
/// so the model never sees an empty conversation.
pub fn trim_history<'a>(
    history: &'a [Message],
    system_context: &str,
    max_context_tokens: u32,
    max_output_tokens: u32,
) -> &'a [Message] {
    if history.is_empty() {
        return history;
    }

    let reserved = system_context.chars().count()
        + max_output_tokens as usize * CHARS_PER_TOKEN
        + SAFETY_BUFFER_CHARS;
    let available = (max_context_tokens as usize * CHARS_PER_TOKEN).saturating_sub(reserved);
    if available == 0 {
        return &history[history.len() - 1..];
    }

    let mut used = 0usize;
    let mut start = history.len();
    for (idx, message) in history.iter().enumerate().rev() {
        let len = message.content.chars().count();
        if used + len > available {
            break;
        }
        used += len;
        start = idx;
    }

    if start == history.len() {
        // Even the newest message alone overflows the budget.
        return &history[history.len() - 1..];
    }
    &history[start..]
}
