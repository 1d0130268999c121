use std::collections::HashSet;

use super::placeholders::substitute;
use super::types::{Character, Message, Settings};

/// Scans the tail of the conversation for lore trigger keys and returns the
/// contents of every triggered entry, blank-line separated.
///
/// The candidate pool is global lorebooks followed by the character's own,
/// enabled books only. Matching is case-insensitive substring search over the
/// last `settings.lore_scan_window` messages. An entry contributes at most
/// once per request even when it appears in several books; output order is
/// pool order, then declaration order — no ranking.
pub fn trigger_lore(history: &[Message], character: &Character, settings: &Settings) -> String {
    let pool: Vec<_> = settings
        .global_lorebooks
        .iter()
        .chain(character.lorebooks.iter())
        .filter(|book| book.enabled)
        .collect();
    if pool.is_empty() {
        return String::new();
    }

    let window = settings.lore_scan_window.max(1);
    let start = history.len().saturating_sub(window);
    let recent_text = history[start..]
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

    let mut triggered: Vec<String> = Vec::new();
    let mut used_ids: HashSet<&str> = HashSet::new();

    for book in pool {
        for entry in &book.entries {
            if !entry.enabled || used_ids.contains(entry.id.as_str()) {
                continue;
            }
            let hit = entry
                .keys
                .normalized()
                .iter()
                .any(|key| recent_text.contains(key.as_str()));
            if hit {
                triggered.push(substitute(&entry.content, character, &settings.user_name));
                used_ids.insert(entry.id.as_str());
            }
        }
    }

    triggered.join("\n\n")
}
