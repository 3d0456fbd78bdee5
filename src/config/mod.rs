//! Configuration module for chartqa.
//!
//! Handles loading application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::Prompts;
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, IndexSettings, LlmSettings, Settings,
};
