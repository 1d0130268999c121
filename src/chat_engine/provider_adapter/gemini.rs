use serde::Serialize;

use crate::abort_manager::CancelToken;
use crate::error::ChatError;
use crate::providers::GEMINI_BASE_URL;
use crate::transport;

use super::super::lorebook_matcher::trigger_lore;
use super::super::placeholders::substitute;
use super::super::prompt_engine::build_system_context;
use super::super::types::{Attachment, Character, Message, Role, Settings};
use super::{fragment_stream, TextStream};

#[derive(Debug, Serialize)]
pub(crate) struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

impl GeminiPart {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub(crate) fn inline(mime_type: &str, data: &str) -> Self {
        Self {
            text: None,
            inline_data: Some(GeminiInlineData {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeminiGoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    google_search: Option<GeminiGoogleSearch>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    generation_config: GeminiGenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
}

/// Adapter for the Gemini generative-language backend.
///
/// Unlike the chat-completions path, history goes out untrimmed (the backend
/// manages its own window) and the system context rides in the dedicated
/// `systemInstruction` field.
pub(crate) async fn stream_chat(
    history: &[Message],
    character: &Character,
    settings: &Settings,
    summary: &str,
    cancel: CancelToken,
) -> Result<TextStream, ChatError> {
    let lore_context = trigger_lore(history, character, settings);
    let system_content = build_system_context(character, settings, &lore_context, summary);

    let contents: Vec<GeminiContent> = history
        .iter()
        .map(|message| {
            let text = if message.content.is_empty() {
                " ".to_string()
            } else {
                substitute(&message.content, character, &settings.user_name)
            };
            GeminiContent {
                role: gemini_role(message.role).to_string(),
                parts: vec![GeminiPart::text(text)],
            }
        })
        .collect();

    let tools = settings.enable_google_search.then(|| {
        vec![GeminiTool {
            google_search: Some(GeminiGoogleSearch {}),
        }]
    });

    let request = GeminiRequest {
        contents,
        system_instruction: Some(GeminiSystemInstruction {
            parts: vec![GeminiPart::text(system_content)],
        }),
        generation_config: GeminiGenerationConfig {
            temperature: Some(settings.temperature),
            top_p: Some(settings.top_p),
            top_k: Some(settings.top_k),
            max_output_tokens: Some(settings.max_output_tokens),
            response_mime_type: None,
        },
        tools,
    };

    stream_request(settings, request, cancel).await
}

/// One-shot character-profile generation with optional binary attachments,
/// asking the backend for a JSON response directly.
pub(crate) async fn stream_generation(
    settings: &Settings,
    system_prompt: &str,
    prompt: &str,
    attachments: &[Attachment],
    existing: &str,
    cancel: CancelToken,
) -> Result<TextStream, ChatError> {
    let mut parts: Vec<GeminiPart> = attachments
        .iter()
        .map(|attachment| GeminiPart::inline(&attachment.mime_type, &attachment.data))
        .collect();
    parts.push(GeminiPart::text(format!(
        "{}\n\nPrompt: {}\n\nExisting JSON (if any): {}",
        system_prompt, prompt, existing
    )));

    let request = GeminiRequest {
        contents: vec![GeminiContent {
            role: "user".into(),
            parts,
        }],
        system_instruction: None,
        generation_config: GeminiGenerationConfig {
            response_mime_type: Some("application/json".into()),
            ..GeminiGenerationConfig::default()
        },
        tools: None,
    };

    stream_request(settings, request, cancel).await
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::Model => "model",
        _ => "user",
    }
}

async fn stream_request(
    settings: &Settings,
    request: GeminiRequest,
    cancel: CancelToken,
) -> Result<TextStream, ChatError> {
    let api_key = settings
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ChatError::Configuration("API Key required for Gemini".into()))?;

    let base = settings
        .custom_endpoint
        .as_deref()
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty())
        .unwrap_or(GEMINI_BASE_URL);
    let url = format!(
        "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
        base.trim_end_matches('/'),
        settings.model_name,
        api_key
    );

    let client = transport::build_client(Some(transport::REQUEST_TIMEOUT_MS))?;
    let builder = client.post(&url).json(&request);

    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(ChatError::Cancelled),
        sent = transport::send_with_retries(builder, transport::MAX_SEND_RETRIES) => sent?,
    };

    let status = response.status();
    if status.as_u16() == 429 {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(body = %body, "gemini quota exhausted");
        return Err(ChatError::QuotaExceeded);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ChatError::Api {
            status: status.as_u16(),
            body,
        });
    }

    Ok(fragment_stream(response, cancel))
}
