//! Configuration module for Kangui.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnalysisPrompts, Prompts};
pub use settings::{
    AnalysisSettings, GeneralSettings, OpenAISettings, PromptSettings, ServerSettings, Settings,
    TranscriptionSettings,
};
