use serde::{Deserialize, Serialize};

use crate::providers::Provider;
use crate::utils::now_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    System,
}

impl Role {
    /// Role string for the OpenAI-compatible wire, where the assistant turn
    /// is called `assistant` rather than `model`.
    pub fn api_role(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "assistant",
            Role::System => "system",
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
            Role::System => "system",
        }
    }
}

/// One turn of conversation. History is append-only and owned by the calling
/// session; the engine never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: u64,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: now_millis(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Character card. All text fields default to empty; the engine treats the
/// whole record as a read-only value for the duration of one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub personality: String,
    pub appearance: String,
    pub first_message: String,
    pub alternate_greetings: Vec<String>,
    pub chat_examples: String,
    pub scenario: String,
    pub style: String,
    pub jailbreak: String,
    pub event_sequence: String,
    pub avatar_url: String,
    pub lorebooks: Vec<Lorebook>,
}

impl Character {
    /// Blank card carrying only a name, used by the internal pipelines
    /// (generation, summarization, connection probes).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lorebook {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub entries: Vec<LorebookEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LorebookEntry {
    pub id: String,
    pub keys: EntryKeys,
    pub content: String,
    pub enabled: bool,
}

/// Trigger keys, stored either as a list or as one comma-joined string
/// (legacy card exports use both shapes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryKeys {
    Many(Vec<String>),
    Joined(String),
}

impl Default for EntryKeys {
    fn default() -> Self {
        EntryKeys::Many(Vec::new())
    }
}

impl EntryKeys {
    /// Trimmed, lower-cased, non-empty key list.
    pub fn normalized(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            EntryKeys::Many(keys) => keys.iter().map(String::as_str).collect(),
            EntryKeys::Joined(joined) => joined.split(',').collect(),
        };
        raw.into_iter()
            .map(|key| key.trim().to_lowercase())
            .filter(|key| !key.is_empty())
            .collect()
    }
}

/// Binary payload attached to a generation request, base64-encoded the way
/// the Gemini wire expects `inlineData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub mime_type: String,
    pub data: String,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        use base64::Engine;
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Immutable per-request configuration snapshot. The engine never mutates a
/// caller's settings; pipelines that need different limits clone first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_provider: Provider,
    pub api_key: Option<String>,
    pub custom_endpoint: Option<String>,
    pub model_name: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub top_a: f64,
    pub repetition_penalty: f64,
    pub max_output_tokens: u32,
    pub stream_response: bool,
    pub user_name: String,
    pub system_prompt_override: Option<String>,
    pub jailbreak_override: Option<String>,
    pub summary_prompt_override: Option<String>,
    pub enable_google_search: bool,
    pub global_lorebooks: Vec<Lorebook>,
    /// Context ceiling for client-side history trimming, in tokens.
    pub max_context_tokens: u32,
    /// How many trailing messages the lore trigger scan looks at.
    pub lore_scan_window: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_provider: Provider::default(),
            api_key: None,
            custom_endpoint: None,
            model_name: String::new(),
            temperature: 0.7,
            top_p: 1.0,
            top_k: 0,
            top_a: 0.0,
            repetition_penalty: 1.0,
            max_output_tokens: 1024,
            stream_response: true,
            user_name: String::new(),
            system_prompt_override: None,
            jailbreak_override: None,
            summary_prompt_override: None,
            enable_google_search: false,
            global_lorebooks: Vec::new(),
            max_context_tokens: 8192,
            lore_scan_window: 7,
        }
    }
}
