pub(crate) mod gemini;
pub(crate) mod openai_compat;

use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::abort_manager::CancelToken;
use crate::error::ChatError;
use crate::providers::Provider;

use super::sse::{FrameDecoder, StreamEvent};
use super::types::{Character, Message, Settings};

/// The unified streaming contract: a lazy, single-pass, forward-only
/// sequence of text fragments. Fragments are produced at most once and the
/// sequence is not restartable.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// Routes a generation request to the adapter matching the configured
/// provider. This is the only place that branches on provider identity for
/// routing; adapters branch internally for protocol details.
pub async fn generate_response(
    history: &[Message],
    character: &Character,
    settings: &Settings,
    summary: &str,
    cancel: CancelToken,
) -> Result<TextStream, ChatError> {
    tracing::debug!(
        provider = settings.api_provider.id(),
        model = %settings.model_name,
        streaming = settings.stream_response,
        "dispatching generation request"
    );
    match settings.api_provider {
        Provider::Gemini => gemini::stream_chat(history, character, settings, summary, cancel).await,
        _ => openai_compat::stream_chat(history, character, settings, summary, cancel).await,
    }
}

enum ReadStep {
    Chunk(Bytes),
    Cancelled,
    Failed(reqwest::Error),
    Eof,
}

/// Turns a streaming HTTP response body into the unified fragment stream.
///
/// The cancel token is checked at every chunk boundary; firing it yields
/// `Cancelled` and drops the connection. The decoder buffer is the only
/// mutable state and lives inside the stream.
pub(crate) fn fragment_stream(response: reqwest::Response, cancel: CancelToken) -> TextStream {
    Box::pin(async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        let mut body = response.bytes_stream();
        'read: loop {
            let step = tokio::select! {
                _ = cancel.cancelled() => ReadStep::Cancelled,
                chunk = body.next() => match chunk {
                    Some(Ok(bytes)) => ReadStep::Chunk(bytes),
                    Some(Err(err)) => ReadStep::Failed(err),
                    None => ReadStep::Eof,
                },
            };
            match step {
                ReadStep::Chunk(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    for event in decoder.feed(&text) {
                        match event {
                            StreamEvent::Delta(piece) => yield Ok(piece),
                            StreamEvent::Done => break 'read,
                        }
                    }
                }
                ReadStep::Cancelled => {
                    tracing::debug!("generation cancelled mid-stream");
                    yield Err(ChatError::Cancelled);
                    break 'read;
                }
                ReadStep::Failed(err) => {
                    yield Err(ChatError::Network(err.to_string()));
                    break 'read;
                }
                ReadStep::Eof => break 'read,
            }
        }
    })
}

/// Non-streaming responses surface as a one-fragment stream so both modes
/// share the same contract.
pub(crate) fn single_fragment(text: String) -> TextStream {
    Box::pin(futures_util::stream::once(async move {
        Ok::<_, ChatError>(text)
    }))
}
