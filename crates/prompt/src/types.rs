//! Prompt types for MedAssist.

use serde::{Deserialize, Serialize};

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Fixed instruction exposed to the template as `{{system}}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// A fully rendered prompt ready for LLM execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    /// Rendered prompt text
    pub text: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    pub source_prompt_id: String,
}

impl BuiltPrompt {
    pub fn new(text: String, source_prompt_id: String) -> Self {
        Self {
            text,
            metadata: BuiltPromptMetadata { source_prompt_id },
        }
    }
}
