use serde_json::Value;

/// One decoded unit of a provider stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of generated text, ready to surface to the consumer.
    Delta(String),
    /// Explicit end-of-stream sentinel (`data: [DONE]`).
    Done,
}

/// Buffered line decoder for streamed chat responses.
///
/// Two frame dialects are recognized: `data: {...}` SSE frames (OpenAI-style
/// deltas and Gemini candidate parts) and the `0:"..."` numeric-prefixed
/// lines emitted by edge-function backends. Incomplete trailing lines are
/// held over until the next chunk; malformed frames are skipped, never fatal,
/// since partial or garbled frames are common with flaky upstreams.
#[derive(Default)]
pub struct FrameDecoder {
    buffer: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Feeds one raw chunk, returning every complete event it closed over.
    pub fn feed(&mut self, chunk: &str) -> Vec<StreamEvent> {
        self.buffer.push_str(chunk);
        let mut events: Vec<StreamEvent> = Vec::new();

        let mut consumed = 0usize;
        for (idx, ch) in self.buffer.char_indices() {
            if ch != '\n' {
                continue;
            }
            let line = self.buffer[consumed..idx].trim();
            consumed = idx + 1;
            if line.is_empty() {
                continue;
            }

            if let Some(text) = decode_edge_frame(line) {
                if !text.is_empty() {
                    events.push(StreamEvent::Delta(text));
                }
                continue;
            }

            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim();
            if payload.is_empty() {
                continue;
            }
            if payload == "[DONE]" {
                events.push(StreamEvent::Done);
                continue;
            }
            match serde_json::from_str::<Value>(payload) {
                Ok(value) => {
                    if let Some(text) = extract_delta(&value) {
                        if !text.is_empty() {
                            events.push(StreamEvent::Delta(text));
                        }
                    }
                    if let Some(reasoning) = extract_reasoning(&value) {
                        if !reasoning.is_empty() {
                            events.push(StreamEvent::Delta(format!("<think>{}</think>", reasoning)));
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, "skipping malformed stream frame");
                }
            }
        }

        if consumed > 0 {
            self.buffer.drain(..consumed);
        }
        events
    }
}

/// `0:"<json-escaped-text>"` edge-function lines. The payload is decoded as a
/// JSON string; undecodable payloads fall back to the raw inner text.
fn decode_edge_frame(line: &str) -> Option<String> {
    let inner = line.strip_prefix("0:\"")?.strip_suffix('"')?;
    match serde_json::from_str::<String>(&format!("\"{}\"", inner)) {
        Ok(text) => Some(text),
        Err(_) => Some(inner.to_string()),
    }
}

fn extract_delta(value: &Value) -> Option<String> {
    if let Some(text) = value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(Value::as_str)
    {
        return Some(text.to_string());
    }

    // Gemini frames: candidates[].content.parts[].text
    if let Some(candidates) = value.get("candidates").and_then(Value::as_array) {
        let mut combined = String::new();
        for candidate in candidates {
            if let Some(parts) = candidate
                .get("content")
                .and_then(|c| c.get("parts"))
                .and_then(Value::as_array)
            {
                for part in parts {
                    if let Some(text) = part.get("text").and_then(Value::as_str) {
                        combined.push_str(text);
                    }
                }
            }
        }
        if !combined.is_empty() {
            return Some(combined);
        }
    }
    None
}

fn extract_reasoning(value: &Value) -> Option<String> {
    let delta = value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))?;
    delta
        .get("reasoning_content")
        .or_else(|| delta.get("reasoning"))
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}
