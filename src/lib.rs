//! Core engine for the Erebos AI roleplay client: prompt assembly, lore
//! triggering, provider streaming, summarization and character generation.
//!
//! The engine holds no state of its own — history, character cards, settings
//! and the running summary are owned by the calling session layer and passed
//! in per request as immutable snapshots.

pub mod abort_manager;
pub mod chat_engine;
pub mod error;
pub mod providers;
pub mod transport;
pub mod utils;
pub mod verify;

pub use abort_manager::CancelToken;
pub use chat_engine::character_gen::{generate_character, ProfileLength};
pub use chat_engine::extract::{coerce_profile, extract_json};
pub use chat_engine::provider_adapter::{generate_response, TextStream};
pub use chat_engine::summarize::{summarize_chat, SummaryLength};
pub use chat_engine::types::{
    Attachment, Character, EntryKeys, Lorebook, LorebookEntry, Message, Role, Settings,
};
pub use error::ChatError;
pub use providers::Provider;
pub use verify::verify_connection;
