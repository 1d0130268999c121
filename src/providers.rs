use serde::{Deserialize, Serialize};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const ROUTEWAY_BASE_URL: &str = "https://api.routeway.ai/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Backend families the engine can talk to.
///
/// Every tag except `Gemini` speaks the OpenAI-compatible chat-completions
/// protocol; `Vercel` is the edge-function variant with its own route and
/// line framing. Routing on this tag happens once, in the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    OpenRouter,
    DeepSeek,
    Routeway,
    Vercel,
    Gemini,
    Custom,
    Puter,
    Horde,
    TextGen,
}

impl Default for Provider {
    fn default() -> Self {
        Provider::OpenAi
    }
}

impl Provider {
    pub fn id(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::OpenRouter => "openrouter",
            Provider::DeepSeek => "deepseek",
            Provider::Routeway => "routeway",
            Provider::Vercel => "vercel",
            Provider::Gemini => "gemini",
            Provider::Custom => "custom",
            Provider::Puter => "puter",
            Provider::Horde => "horde",
            Provider::TextGen => "textgen",
        }
    }

    /// Providers that accept `repetition_penalty` / `top_k` / `top_a` in the
    /// request body.
    pub fn supports_extended_sampling(&self) -> bool {
        matches!(
            self,
            Provider::Custom
                | Provider::OpenRouter
                | Provider::Routeway
                | Provider::Puter
                | Provider::Horde
                | Provider::TextGen
        )
    }

    /// Puter and Horde do not take bearer auth; Horde uses an `apikey`
    /// header instead.
    pub fn sends_bearer_auth(&self) -> bool {
        !matches!(self, Provider::Puter | Provider::Horde)
    }

    pub fn base_url(&self, custom_endpoint: Option<&str>) -> String {
        let custom = custom_endpoint.map(str::trim).filter(|s| !s.is_empty());
        match self {
            Provider::OpenRouter => OPENROUTER_BASE_URL.to_string(),
            Provider::DeepSeek => DEEPSEEK_BASE_URL.to_string(),
            Provider::Routeway => ROUTEWAY_BASE_URL.to_string(),
            Provider::Vercel => custom.unwrap_or_default().to_string(),
            _ => custom.unwrap_or(OPENAI_BASE_URL).to_string(),
        }
    }
}

/// Resolves the full request URL for the OpenAI-compatible path.
///
/// The chat-completions route is appended unless the endpoint already carries
/// it. Vercel edge functions use an `/api/chat` route instead, skipped when
/// the operator endpoint already looks API-rooted.
pub fn chat_completions_url(provider: Provider, custom_endpoint: Option<&str>) -> String {
    let base = provider.base_url(custom_endpoint);
    if provider == Provider::Vercel {
        if base.contains("/api/") || base.contains("/v1/") {
            return base;
        }
        return if base.ends_with('/') {
            format!("{}api/chat", base)
        } else {
            format!("{}/api/chat", base)
        };
    }
    if base.contains("/chat/completions") {
        return base;
    }
    if base.ends_with('/') {
        format!("{}chat/completions", base)
    } else {
        format!("{}/chat/completions", base)
    }
}
