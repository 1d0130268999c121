use serde_json::{json, Value};

use crate::abort_manager::CancelToken;
use crate::error::ChatError;
use crate::providers::{self, Provider};
use crate::transport;

use super::super::history::trim_history;
use super::super::lorebook_matcher::trigger_lore;
use super::super::placeholders::substitute;
use super::super::prompt_engine::build_system_context;
use super::super::types::{Character, Message, Settings};
use super::{fragment_stream, single_fragment, TextStream};

/// Adapter for every chat-completions-compatible backend (OpenAI, OpenRouter,
/// DeepSeek, Routeway, edge functions, self-hosted endpoints, Horde, ...).
///
/// Builds the system context, trims history to the configured context
/// ceiling, posts one chat-completions request and exposes the response as
/// the unified fragment stream.
pub(crate) async fn stream_chat(
    history: &[Message],
    character: &Character,
    settings: &Settings,
    summary: &str,
    cancel: CancelToken,
) -> Result<TextStream, ChatError> {
    let lore_context = trigger_lore(history, character, settings);
    let system_content = build_system_context(character, settings, &lore_context, summary);

    let max_output = if settings.max_output_tokens == 0 {
        1024
    } else {
        settings.max_output_tokens
    };
    let trimmed = trim_history(history, &system_content, settings.max_context_tokens, max_output);

    let mut messages: Vec<Value> = Vec::with_capacity(trimmed.len() + 1);
    messages.push(json!({ "role": "system", "content": system_content }));
    for message in trimmed {
        let content = if message.content.is_empty() {
            ".".to_string()
        } else {
            substitute(&message.content, character, &settings.user_name)
        };
        messages.push(json!({ "role": message.role.api_role(), "content": content }));
    }

    let url = providers::chat_completions_url(
        settings.api_provider,
        settings.custom_endpoint.as_deref(),
    );
    let body = build_request_body(settings, messages);

    let client = transport::build_client(Some(transport::REQUEST_TIMEOUT_MS))?;
    let mut request = client.post(&url);
    for (name, value) in request_headers(settings) {
        request = request.header(name, value);
    }
    request = request.json(&body);

    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(ChatError::Cancelled),
        sent = transport::send_with_retries(request, transport::MAX_SEND_RETRIES) => sent?,
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "provider rejected chat request");
        return Err(ChatError::Api {
            status: status.as_u16(),
            body,
        });
    }

    if !settings.stream_response {
        let value: Value = response.json().await.map_err(ChatError::from)?;
        let text = match &value {
            Value::String(s) => s.clone(),
            _ => value
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("message"))
                .and_then(|m| m.get("content"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        };
        return Ok(single_fragment(text));
    }

    Ok(fragment_stream(response, cancel))
}

fn build_request_body(settings: &Settings, messages: Vec<Value>) -> Value {
    let mut body = json!({
        "model": settings.model_name,
        "messages": messages,
        "temperature": settings.temperature,
        "max_tokens": settings.max_output_tokens,
        "stream": settings.stream_response,
        "top_p": settings.top_p,
    });

    if settings.api_provider.supports_extended_sampling() {
        body["repetition_penalty"] = json!(settings.repetition_penalty);
        body["top_k"] = json!(settings.top_k);
        body["top_a"] = json!(settings.top_a);
    }

    // OpenAI has no repetition_penalty knob; anything above neutral maps onto
    // frequency_penalty, clamped to the API maximum.
    if settings.api_provider == Provider::OpenAi && settings.repetition_penalty > 1.0 {
        let penalty = ((settings.repetition_penalty - 1.0) * 2.0).min(2.0);
        body["frequency_penalty"] = json!(penalty);
    }

    body
}

fn request_headers(settings: &Settings) -> Vec<(&'static str, String)> {
    let mut headers = vec![("Content-Type", "application/json".to_string())];
    let api_key = settings
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty());

    if let Some(key) = api_key {
        if settings.api_provider.sends_bearer_auth() {
            headers.push(("Authorization", format!("Bearer {}", key)));
        }
    }
    if settings.api_provider == Provider::OpenRouter {
        headers.push(("HTTP-Referer", "https://erebos.app".to_string()));
        headers.push(("X-Title", "Erebos AI".to_string()));
    }
    if settings.api_provider == Provider::Horde {
        headers.push(("apikey", api_key.unwrap_or("0000000000").to_string()));
    }
    headers
}
