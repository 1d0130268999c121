pub mod character_gen;
pub mod extract;
pub mod history;
pub mod lorebook_matcher;
pub mod placeholders;
pub mod prompt_engine;
pub mod provider_adapter;
pub mod sse;
pub mod summarize;
pub mod types;
