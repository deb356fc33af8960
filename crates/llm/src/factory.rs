//! LLM provider factory.
//!
//! Builds the completion client selected in the application configuration.

use crate::client::LlmClient;
use crate::providers::{GroqClient, OllamaClient};
use crate::types::ProviderType;
use medassist_core::config::LlmSettings;
use medassist_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client from configuration.
///
/// # Errors
/// Returns a configuration error if:
/// - Provider is unknown
/// - Required API key is missing
/// - The HTTP client cannot be built
pub fn create_client(settings: &LlmSettings, timeout: Duration) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", settings.provider)))?;

    match provider {
        ProviderType::Groq => {
            let api_key = settings.api_key.as_ref().ok_or_else(|| {
                AppError::Config("Groq provider requires GROQ_API_KEY".to_string())
            })?;
            let client = match settings.endpoint.as_deref() {
                Some(endpoint) => GroqClient::with_base_url(endpoint, api_key.expose(), timeout)?,
                None => GroqClient::new(api_key.expose(), timeout)?,
            };
            Ok(Arc::new(client))
        }
        ProviderType::Ollama => {
            let client = match settings.endpoint.as_deref() {
                Some(endpoint) => OllamaClient::with_base_url(endpoint, timeout)?,
                None => OllamaClient::new(timeout)?,
            };
            Ok(Arc::new(client))
        }
    }
}
