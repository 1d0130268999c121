use std::time::Duration;

use tokio::time::sleep;

use crate::error::ChatError;

/// Total request timeout applied to provider calls, streaming included.
pub const REQUEST_TIMEOUT_MS: u64 = 120_000;

/// Retries applied to the initial send of a provider request.
pub const MAX_SEND_RETRIES: u32 = 2;

pub fn build_client(timeout_ms: Option<u64>) -> Result<reqwest::Client, ChatError> {
    let mut builder = reqwest::Client::builder();
    if let Some(ms) = timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    builder.build().map_err(ChatError::from)
}

/// Sends a request, retrying transport errors, timeouts and 5xx responses
/// with exponential backoff. Requests with non-clonable bodies are sent once.
pub async fn send_with_retries(
    builder: reqwest::RequestBuilder,
    max_retries: u32,
) -> Result<reqwest::Response, ChatError> {
    let base = match builder.try_clone() {
        Some(clone) => clone,
        None => return builder.send().await.map_err(ChatError::from),
    };

    let mut attempt: u32 = 0;
    loop {
        let attempt_builder = match base.try_clone() {
            Some(clone) => clone,
            None => return Err(ChatError::Network("request body is not retryable".into())),
        };
        match attempt_builder.send().await {
            Ok(response) => {
                if response.status().is_server_error() && attempt < max_retries {
                    attempt += 1;
                    let delay = backoff_delay_ms(attempt);
                    tracing::warn!(
                        status = %response.status(),
                        delay_ms = delay,
                        attempt,
                        "server error, retrying"
                    );
                    sleep(Duration::from_millis(delay)).await;
                } else {
                    return Ok(response);
                }
            }
            Err(err) => {
                if (err.is_timeout() || err.is_request()) && attempt < max_retries {
                    attempt += 1;
                    let delay = backoff_delay_ms(attempt);
                    tracing::warn!(error = %err, delay_ms = delay, attempt, "request error, retrying");
                    sleep(Duration::from_millis(delay)).await;
                } else {
                    return Err(ChatError::from(err));
                }
            }
        }
    }
}

fn backoff_delay_ms(attempt: u32) -> u64 {
    // 200ms, 400ms, 800ms (cap at 1.6s)
    200u64 * (1u64 << (attempt.saturating_sub(1).min(3)))
}
