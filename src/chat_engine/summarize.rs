use futures_util::StreamExt;

use crate::abort_manager::CancelToken;
use crate::error::ChatError;

use super::provider_adapter::generate_response;
use super::types::{Character, Message, Settings};

/// Target size/style of the produced summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryLength {
    Short,
    Medium,
    Detailed,
}

const SAFETY_HEADER: &str = "IMPORTANT SECURITY PROTOCOL:\n\
1. Do NOT hallucinate events.\n\
2. Do NOT invent characters or locations not present in the log.\n\
3. If the provided log is short, the summary should be short. Do not fluff it up.\n\
4. Rely EXCLUSIVELY on the provided log.";

const SUMMARY_SYSTEM_PROMPT: &str = "You are an objective analytical engine designed to summarize text data with high fidelity. You prioritize accuracy over creativity.";

struct SummaryPolicy {
    length_constraint: String,
    style_guide: String,
    max_output_tokens: u32,
}

fn policy_for(settings: &Settings, length: SummaryLength) -> SummaryPolicy {
    // A custom operator instruction replaces the tier-based style guide
    // entirely and gets the widest output window.
    if let Some(custom) = settings
        .summary_prompt_override
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return SummaryPolicy {
            length_constraint: "Follow the custom user instruction above for length and detail."
                .into(),
            style_guide: format!("CUSTOM USER INSTRUCTION: {}", custom),
            max_output_tokens: 8192,
        };
    }

    match length {
        SummaryLength::Short => SummaryPolicy {
            length_constraint: "Length: Concise (~100 words).".into(),
            style_guide:
                "Focus strictly on the current status and immediate context. Discard historical fluff."
                    .into(),
            max_output_tokens: 512,
        },
        SummaryLength::Medium => SummaryPolicy {
            length_constraint: "Length: Moderate (~300 words).".into(),
            style_guide:
                "Capture the main plot points, key decisions, and emotional shifts. Provide a balanced overview."
                    .into(),
            max_output_tokens: 1024,
        },
        SummaryLength::Detailed => SummaryPolicy {
            length_constraint:
                "Length: Comprehensive. Include all available details from the log.".into(),
            style_guide:
                "You are a meticulous archivist. Your goal is preservation of detail. Retell the narrative including specific dialogue quotes, setting changes, and character internal states found in the text. CRITICAL: Do not invent new events to make it longer. Only summarize what is there, but do so with maximum granularity."
                    .into(),
            max_output_tokens: 8192,
        },
    }
}

fn build_summary_prompt(
    messages: &[Message],
    existing_summary: Option<&str>,
    policy: &SummaryPolicy,
) -> String {
    let log = messages
        .iter()
        .map(|m| format!("{}: {}", m.role.tag().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n");

    match existing_summary {
        Some(current) => format!(
            "Update the existing summary with new events from the logs below.\n\n\
[EXISTING SUMMARY]:\n{current}\n\n\
[NEW INTERACTION LOG]:\n{log}\n\n\
INSTRUCTIONS:\n\
1. Merge the new events naturally into the narrative.\n\
2. {length}\n\
3. {style}\n\
4. {safety}\n\n\
Output only the updated summary text.",
            current = current,
            log = log,
            length = policy.length_constraint,
            style = policy.style_guide,
            safety = SAFETY_HEADER,
        ),
        None => format!(
            "Generate a comprehensive narrative record of the following conversation log.\n\n\
[FULL CONVERSATION LOG]:\n{log}\n\n\
INSTRUCTIONS:\n\
1. Read the entire log from start to finish.\n\
2. {style}\n\
3. {length}\n\
4. {safety}\n\n\
Output only the summary text.",
            log = log,
            length = policy.length_constraint,
            style = policy.style_guide,
            safety = SAFETY_HEADER,
        ),
    }
}

/// Condenses a message window into a single summary string, either from
/// scratch or by merging into `existing_summary`.
///
/// The prompt runs through the unified stream with an analytical system
/// prompt; fragments are accumulated here rather than streamed to the caller.
/// Errors propagate — a partial accumulation is never silently returned.
pub async fn summarize_chat(
    messages: &[Message],
    settings: &Settings,
    existing_summary: Option<&str>,
    length: SummaryLength,
    cancel: CancelToken,
) -> Result<String, ChatError> {
    let policy = policy_for(settings, length);
    let prompt = build_summary_prompt(messages, existing_summary, &policy);

    let mut summary_settings = settings.clone();
    summary_settings.max_output_tokens = policy.max_output_tokens;
    summary_settings.system_prompt_override = Some(SUMMARY_SYSTEM_PROMPT.to_string());

    let narrator = Character::named("System");
    let history = vec![Message::user(prompt)];

    let mut stream =
        generate_response(&history, &narrator, &summary_settings, "", cancel).await?;

    let mut summary = String::new();
    while let Some(fragment) = stream.next().await {
        summary.push_str(&fragment?);
    }
    Ok(summary)
}
