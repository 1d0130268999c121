use crate::abort_manager::CancelToken;
use crate::error::ChatError;
use crate::providers::Provider;

use super::provider_adapter::{gemini, openai_compat, TextStream};
use super::types::{Attachment, Character, Message, Settings};

/// Target size of a generated character profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileLength {
    Short,
    Medium,
    Long,
}

fn length_directive(length: ProfileLength) -> &'static str {
    match length {
        ProfileLength::Short => {
            "Keep the profile concise. Aim for efficient descriptions. Approx 200 words total."
        }
        ProfileLength::Medium => {
            "Standard roleplay character profile. Balanced detail. Approx 400 words total."
        }
        ProfileLength::Long => {
            "Extensive and detailed. Deep personality analysis. Approx 800+ words total."
        }
    }
}

pub(crate) fn build_generation_system_prompt(
    length: ProfileLength,
    include_sequence: bool,
    detailed_sequence: bool,
) -> String {
    let fields = if include_sequence {
        "{ name, tagline, description, personality, appearance, firstMessage, chatExamples, scenario, jailbreak, style, eventSequence }"
    } else {
        "{ name, tagline, description, personality, appearance, firstMessage, chatExamples, scenario, jailbreak, style }"
    };

    let mut prompt = format!(
        "You are an expert character creator. Generate a JSON output for a character based on the user's prompt.\n\
Format: JSON matching {}.\n\n\
LENGTH INSTRUCTION: {}\n\
Ensure the JSON is valid and content fields match the requested length.",
        fields,
        length_directive(length)
    );

    if include_sequence {
        prompt.push_str(
            "\nThe eventSequence field must outline the planned story beats for this character.",
        );
        if detailed_sequence {
            prompt.push_str(
                " Make it a numbered, chapter-by-chapter chain of events covering the full arc.",
            );
        }
    }

    prompt
}

/// Builds a one-shot profile-generation request and returns the unified
/// stream of raw output. The output is expected to contain one JSON object;
/// recovering it is the job of `extract::extract_json` + `coerce_profile` —
/// this pipeline performs no schema validation.
///
/// Attachments ride along on the Gemini path only; the HTTP-compatible path
/// ignores them. `existing` is prior partial output the model should continue
/// from.
#[allow(clippy::too_many_arguments)]
pub async fn generate_character(
    prompt: &str,
    length: ProfileLength,
    settings: &Settings,
    attachments: &[Attachment],
    existing: &str,
    include_sequence: bool,
    cancel: CancelToken,
    detailed_sequence: bool,
) -> Result<TextStream, ChatError> {
    let system_prompt = build_generation_system_prompt(length, include_sequence, detailed_sequence);

    if settings.api_provider == Provider::Gemini {
        return gemini::stream_generation(settings, &system_prompt, prompt, attachments, existing, cancel)
            .await;
    }

    let text_prompt = format!("Prompt: {}\n\nExisting: {}", prompt, existing);
    let mut generation_settings = settings.clone();
    generation_settings.system_prompt_override = Some(system_prompt);

    let history = vec![Message::user(text_prompt)];
    let generator = Character::named("Generator");
    openai_compat::stream_chat(&history, &generator, &generation_settings, "", cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_every_schema_field() {
        let prompt = build_generation_system_prompt(ProfileLength::Medium, false, false);
        for field in [
            "name",
            "tagline",
            "description",
            "personality",
            "appearance",
            "firstMessage",
            "chatExamples",
            "scenario",
            "jailbreak",
            "style",
        ] {
            assert!(prompt.contains(field), "missing field {}", field);
        }
        assert!(!prompt.contains("eventSequence"));
    }

    #[test]
    fn test_length_tiers_change_the_directive() {
        let short = build_generation_system_prompt(ProfileLength::Short, false, false);
        let long = build_generation_system_prompt(ProfileLength::Long, false, false);
        assert!(short.contains("Approx 200 words"));
        assert!(long.contains("Approx 800+ words"));
    }

    #[test]
    fn test_sequence_flags_extend_the_schema() {
        let with_sequence = build_generation_system_prompt(ProfileLength::Medium, true, false);
        assert!(with_sequence.contains("eventSequence"));
        assert!(with_sequence.contains("story beats"));
        assert!(!with_sequence.contains("chapter-by-chapter"));

        let detailed = build_generation_system_prompt(ProfileLength::Medium, true, true);
        assert!(detailed.contains("chapter-by-chapter"));
    }
}
