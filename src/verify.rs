use futures_util::StreamExt;

use crate::abort_manager::CancelToken;
use crate::chat_engine::provider_adapter::generate_response;
use crate::chat_engine::types::{Character, Message, Settings};
use crate::error::ChatError;

/// Sends a minimal probe through the configured provider and reports whether
/// a response came back. Errors propagate unchanged so callers can surface
/// the provider's own diagnostics.
pub async fn verify_connection(settings: &Settings) -> Result<bool, ChatError> {
    let mut probe_settings = settings.clone();
    probe_settings.max_output_tokens = 10;

    let probe = Character::named("Test");
    let history = vec![Message::user("hi")];

    let mut stream =
        generate_response(&history, &probe, &probe_settings, "", CancelToken::new()).await?;
    while let Some(fragment) = stream.next().await {
        if !fragment?.is_empty() {
            return Ok(true);
        }
    }
    Ok(true)
}
