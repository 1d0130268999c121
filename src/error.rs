use std::fmt::{Display, Formatter};

/// Errors surfaced by the generation pipeline.
///
/// `Cancelled` is a cooperative abort and must not be presented as a failure;
/// everything else should reach the operator, including the raw provider body
/// where one exists, since upstream error text is often the only diagnostic
/// signal available.
#[derive(Debug)]
pub enum ChatError {
    /// Transport-level failure before or during a response.
    Network(String),
    /// Non-2xx response from the provider, body passed through verbatim.
    Api { status: u16, body: String },
    /// The caller's cancel token fired mid-request.
    Cancelled,
    /// Rate/quota limit on the Gemini path (HTTP 429 semantics).
    QuotaExceeded,
    /// Missing or unusable credential/endpoint configuration.
    Configuration(String),
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::Network(message) => write!(f, "Network Error: {}", message),
            ChatError::Api { status, body } => write!(f, "API Error {}: {}", status, body),
            ChatError::Cancelled => write!(f, "Aborted"),
            ChatError::QuotaExceeded => write!(f, "QUOTA_EXCEEDED"),
            ChatError::Configuration(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<reqwest::Error> for ChatError {
    fn from(value: reqwest::Error) -> Self {
        ChatError::Network(value.to_string())
    }
}
