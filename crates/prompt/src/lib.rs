//! Prompt system for MedAssist.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions (built-in, overridable from a directory)
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::PromptSet;
pub use loader::{load_prompt, ANSWER_PROMPT_ID, REWRITE_PROMPT_ID};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
