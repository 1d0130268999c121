use super::placeholders::substitute;
use super::types::{Character, Settings};

/// Base instruction used when the operator has not supplied a system prompt
/// override. Markers are resolved per request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert roleplayer portraying {{char}} in an interactive story with {{user}}. \
Stay fully in character at every turn. Respond based on {{char}}'s personality, knowledge and current situation, \
showing emotion and initiative through dialogue and action. Never speak or act for {{user}}, never break the fourth wall, \
and never answer like an assistant.";

const LORE_BLOCK_HEADER: &str = "### World Info / Lorebook Database (Active Context):\nThe following information regarding the world, items, or characters is active:";

const SUMMARY_BLOCK_HEADER: &str = "[PREVIOUS CONVERSATION SUMMARY]:\nThe following is the memory of the events so far. You MUST use this context to maintain continuity:";

/// Composes the system preamble: base instructions, identity fields, the
/// optional scenario/style/examples/jailbreak sections, triggered lore and
/// the running summary. Empty segments are dropped; the rest join with a
/// blank line.
pub fn build_system_context(
    character: &Character,
    settings: &Settings,
    lore_context: &str,
    summary: &str,
) -> String {
    let sub = |text: &str| substitute(text, character, &settings.user_name);

    let base = settings
        .system_prompt_override
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let mut parts: Vec<String> = vec![
        sub(base),
        format!("[Character Name: {}]", character.name),
        format!("[Description: {}]", sub(&character.description)),
        format!("[Personality: {}]", sub(&character.personality)),
        format!("[Appearance: {}]", sub(&character.appearance)),
    ];

    if !character.scenario.is_empty() {
        parts.push(format!("[Scenario: {}]", sub(&character.scenario)));
    }
    if !character.style.is_empty() {
        parts.push(format!("[Writing Style: {}]", sub(&character.style)));
    }
    if !character.chat_examples.is_empty() {
        parts.push(format!("[Dialogue Examples:\n{}]", sub(&character.chat_examples)));
    }
    if !character.jailbreak.is_empty() {
        parts.push(format!("[System/Jailbreak: {}]", sub(&character.jailbreak)));
    } else if let Some(jailbreak) = settings.jailbreak_override.as_deref() {
        // The settings-level fallback is injected bare, without the bracket
        // wrapper, so operators control its framing entirely.
        if !jailbreak.is_empty() {
            parts.push(sub(jailbreak));
        }
    }
    if !lore_context.is_empty() {
        parts.push(format!("{}\n{}", LORE_BLOCK_HEADER, lore_context));
    }
    if !summary.is_empty() {
        parts.push(format!("{}\n\"{}\"", SUMMARY_BLOCK_HEADER, sub(summary)));
    }

    parts.retain(|part| !part.is_empty());
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character() -> Character {
        Character {
            name: "Aria".into(),
            description: "A wandering {{char}} archivist.".into(),
            personality: "curious".into(),
            appearance: "silver hair".into(),
            ..Character::default()
        }
    }

    #[test]
    fn test_identity_fields_always_present() {
        let out = build_system_context(&character(), &Settings::default(), "", "");
        assert!(out.contains("[Character Name: Aria]"));
        assert!(out.contains("[Description: A wandering Aria archivist.]"));
        assert!(out.contains("[Personality: curious]"));
        assert!(out.contains("[Appearance: silver hair]"));
    }

    #[test]
    fn test_empty_optional_sections_are_omitted() {
        let out = build_system_context(&character(), &Settings::default(), "", "");
        assert!(!out.contains("[Scenario:"));
        assert!(!out.contains("[Writing Style:"));
        assert!(!out.contains("[Dialogue Examples:"));
        assert!(!out.contains("[System/Jailbreak:"));
    }

    #[test]
    fn test_scenario_and_style_included_when_set() {
        let mut c = character();
        c.scenario = "lost library".into();
        c.style = "gothic".into();
        let out = build_system_context(&c, &Settings::default(), "", "");
        assert!(out.contains("[Scenario: lost library]"));
        assert!(out.contains("[Writing Style: gothic]"));
    }

    #[test]
    fn test_character_jailbreak_wins_over_settings_override() {
        let mut c = character();
        c.jailbreak = "card level".into();
        let settings = Settings {
            jailbreak_override: Some("settings level".into()),
            ..Settings::default()
        };
        let out = build_system_context(&c, &settings, "", "");
        assert!(out.contains("[System/Jailbreak: card level]"));
        assert!(!out.contains("settings level"));
    }

    #[test]
    fn test_settings_jailbreak_fallback_is_unwrapped() {
        let settings = Settings {
            jailbreak_override: Some("settings level for {{char}}".into()),
            ..Settings::default()
        };
        let out = build_system_context(&character(), &settings, "", "");
        assert!(out.contains("settings level for Aria"));
        assert!(!out.contains("[System/Jailbreak:"));
    }

    #[test]
    fn test_lore_and_summary_blocks_carry_headers() {
        let out = build_system_context(
            &character(),
            &Settings::default(),
            "The moon is hollow.",
            "{{user}} found the key.",
        );
        assert!(out.contains("### World Info / Lorebook Database (Active Context):"));
        assert!(out.contains("The moon is hollow."));
        assert!(out.contains("[PREVIOUS CONVERSATION SUMMARY]:"));
        assert!(out.contains("\"User found the key.\""));
    }

    #[test]
    fn test_override_replaces_default_prompt() {
        let settings = Settings {
            system_prompt_override: Some("Custom base for {{char}}.".into()),
            ..Settings::default()
        };
        let out = build_system_context(&character(), &settings, "", "");
        assert!(out.starts_with("Custom base for Aria."));
        assert!(!out.contains("expert roleplayer"));
    }
}
