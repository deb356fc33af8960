//! Prompt loader for built-in and user-supplied YAML prompt definitions.
//!
//! Built-in definitions ship inside the binary. A prompts directory may
//! replace any of them with a file named `<id>.yml`.

use crate::types::PromptDefinition;
use medassist_core::{AppError, AppResult};
use std::path::Path;

/// Identifier of the retrieval query rewrite prompt.
pub const REWRITE_PROMPT_ID: &str = "medical.rewrite";

/// Identifier of the context-grounded answer prompt.
pub const ANSWER_PROMPT_ID: &str = "medical.answer";

const BUILTIN_PROMPTS: &[(&str, &str)] = &[
    (
        REWRITE_PROMPT_ID,
        include_str!("../prompts/medical.rewrite.yml"),
    ),
    (
        ANSWER_PROMPT_ID,
        include_str!("../prompts/medical.answer.yml"),
    ),
];

/// Load a prompt definition by ID.
///
/// Looks for `<prompts_dir>/<id>.yml` first and falls back to the
/// built-in definition with the same ID.
pub fn load_prompt(prompts_dir: Option<&Path>, prompt_id: &str) -> AppResult<PromptDefinition> {
    if let Some(dir) = prompts_dir {
        let prompt_file = dir.join(format!("{}.yml", prompt_id));
        if prompt_file.exists() {
            tracing::debug!("Loading prompt override from: {:?}", prompt_file);

            let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
                AppError::Prompt(format!(
                    "Failed to read prompt file {:?}: {}",
                    prompt_file, e
                ))
            })?;

            let definition = parse_prompt(&contents, &prompt_file.display().to_string())?;
            if definition.id != prompt_id {
                return Err(AppError::Prompt(format!(
                    "Prompt file {:?} declares id '{}', expected '{}'",
                    prompt_file, definition.id, prompt_id
                )));
            }

            tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);
            return Ok(definition);
        }
    }

    let (_, contents) = BUILTIN_PROMPTS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Prompt not found: {}", prompt_id)))?;

    parse_prompt(contents, &format!("built-in {}", prompt_id))
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
