use super::types::Character;

const CHAR_MARKER: &[u8] = b"{{char}}";
const USER_MARKER: &[u8] = b"{{user}}";

/// Replaces every `{{char}}` / `{{user}}` marker, case-insensitively, with
/// the character's name (fallback `Character`) and the operator's display
/// name (fallback `User`).
///
/// Single pass: a replacement value containing a marker is not re-scanned.
pub fn substitute(text: &str, character: &Character, user_name: &str) -> String {
    let char_name = if character.name.trim().is_empty() {
        "Character"
    } else {
        character.name.as_str()
    };
    let user = if user_name.trim().is_empty() {
        "User"
    } else {
        user_name
    };

    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut skip_until = 0usize;
    for (idx, ch) in text.char_indices() {
        if idx < skip_until {
            continue;
        }
        if marker_at(bytes, idx, CHAR_MARKER) {
            out.push_str(char_name);
            skip_until = idx + CHAR_MARKER.len();
            continue;
        }
        if marker_at(bytes, idx, USER_MARKER) {
            out.push_str(user);
            skip_until = idx + USER_MARKER.len();
            continue;
        }
        out.push(ch);
    }
    out
}

fn marker_at(bytes: &[u8], idx: usize, marker: &[u8]) -> bool {
    bytes.len() - idx >= marker.len() && bytes[idx..idx + marker.len()].eq_ignore_ascii_case(marker)
}
