//! Prompt builder for rendering templates.

use crate::loader::{load_prompt, ANSWER_PROMPT_ID, REWRITE_PROMPT_ID};
use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use medassist_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// The prompt definitions used by the answer pipeline, compiled once.
///
/// Templates are registered at construction so a broken override is
/// reported at startup rather than on the first request.
pub struct PromptSet {
    handlebars: Handlebars<'static>,
    definitions: HashMap<String, PromptDefinition>,
}

impl PromptSet {
    /// Load the rewrite and answer prompts, honouring overrides in `prompts_dir`.
    pub fn load(prompts_dir: Option<&Path>) -> AppResult<Self> {
        let definitions = vec![
            load_prompt(prompts_dir, REWRITE_PROMPT_ID)?,
            load_prompt(prompts_dir, ANSWER_PROMPT_ID)?,
        ];
        Self::from_definitions(definitions)
    }

    /// Build a set from already loaded definitions.
    pub fn from_definitions(definitions: Vec<PromptDefinition>) -> AppResult<Self> {
        let mut handlebars = Handlebars::new();

        // Prompts are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);

        let mut by_id = HashMap::new();
        for definition in definitions {
            handlebars
                .register_template_string(&definition.id, &definition.template)
                .map_err(|e| {
                    AppError::Prompt(format!(
                        "Failed to register template '{}': {}",
                        definition.id, e
                    ))
                })?;
            by_id.insert(definition.id.clone(), definition);
        }

        Ok(Self {
            handlebars,
            definitions: by_id,
        })
    }

    /// Get a loaded definition.
    pub fn definition(&self, prompt_id: &str) -> Option<&PromptDefinition> {
        self.definitions.get(prompt_id)
    }

    /// Render a prompt with the given variables.
    ///
    /// The definition's `system` text, when present, is available to the
    /// template as `{{system}}`.
    pub fn build(
        &self,
        prompt_id: &str,
        mut variables: HashMap<String, String>,
    ) -> AppResult<BuiltPrompt> {
        let definition = self
            .definitions
            .get(prompt_id)
            .ok_or_else(|| AppError::Prompt(format!("Prompt not loaded: {}", prompt_id)))?;

        if let Some(ref system) = definition.system {
            variables.insert("system".to_string(), system.clone());
        }

        let text = self
            .handlebars
            .render(prompt_id, &variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        tracing::trace!(prompt_id, len = text.len(), "Rendered prompt");

        Ok(BuiltPrompt::new(text, definition.id.clone()))
    }

    /// Render the retrieval rewrite prompt for a question.
    pub fn rewrite_prompt(&self, question: &str) -> AppResult<BuiltPrompt> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        self.build(REWRITE_PROMPT_ID, variables)
    }

    /// Render the grounded answer prompt for a question and its context.
    pub fn answer_prompt(&self, question: &str, context: &str) -> AppResult<BuiltPrompt> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert("context".to_string(), context.to_string());
        self.build(ANSWER_PROMPT_ID, variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(id: &str, template: &str) -> PromptDefinition {
        PromptDefinition {
            id: id.to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            system: None,
            template: template.to_string(),
        }
    }

    #[test]
    fn test_rewrite_prompt_embeds_question_verbatim() {
        let prompts = PromptSet::load(None).unwrap();
        let built = prompts.rewrite_prompt("what's a <migraine> & aura?").unwrap();

        assert_eq!(
            built.text,
            "Rewrite the following question into a clear, concise medical query for retrieval:\n\
             User question: \"what's a <migraine> & aura?\"\n\
             Clear question:"
        );
        assert_eq!(built.metadata.source_prompt_id, REWRITE_PROMPT_ID);
    }

    #[test]
    fn test_answer_prompt_layout() {
        let prompts = PromptSet::load(None).unwrap();
        let built = prompts
            .answer_prompt("What is a migraine?", "Passage one\n\nPassage two")
            .unwrap();

        let system = prompts
            .definition(ANSWER_PROMPT_ID)
            .and_then(|d| d.system.clone())
            .unwrap();

        let expected = format!(
            "{}\n\nContext:\nPassage one\n\nPassage two\n\nUser Question: What is a migraine?\nAnswer:",
            system
        );
        assert_eq!(built.text, expected);
    }

    #[test]
    fn test_answer_prompt_with_empty_context() {
        let prompts = PromptSet::load(None).unwrap();
        let built = prompts.answer_prompt("Q?", "").unwrap();

        assert!(built.text.contains("Context:\n\n\nUser Question: Q?"));
    }

    #[test]
    fn test_question_with_braces_is_not_interpreted() {
        let prompts = PromptSet::load(None).unwrap();
        let built = prompts.rewrite_prompt("{{context}} here").unwrap();
        assert!(built.text.contains("\"{{context}} here\""));
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let prompts = PromptSet::from_definitions(vec![definition("t", "Q: {{missing}}")]).unwrap();
        let built = prompts.build("t", HashMap::new()).unwrap();
        assert_eq!(built.text, "Q: ");
    }

    #[test]
    fn test_broken_template_rejected_at_load() {
        let result = PromptSet::from_definitions(vec![definition("t", "{{#if}}")]);
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_unknown_prompt_id() {
        let prompts = PromptSet::load(None).unwrap();
        assert!(prompts.build("nope", HashMap::new()).is_err());
    }
}
