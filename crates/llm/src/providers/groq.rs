//! Groq LLM provider implementation.
//!
//! Groq exposes an OpenAI-compatible chat completions API.
//! Groq API: https://console.groq.com/docs/api-reference#chat-create

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use medassist_core::{AppError, AppResult, ServiceFailure};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Groq API base URL.
pub const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1";

/// Chat completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat completions response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Groq LLM client.
pub struct GroqClient {
    /// Base URL for the OpenAI-compatible API
    base_url: String,

    /// Bearer token
    api_key: String,

    /// HTTP client
    client: reqwest::Client,
}

impl GroqClient {
    /// Create a new Groq client against the public API.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_GROQ_URL, api_key, timeout)
    }

    /// Create a new Groq client with a custom base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client for Groq: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Convert LlmRequest to a single-turn chat completions request.
    fn to_chat_request(&self, request: &LlmRequest) -> ChatRequest {
        ChatRequest {
            model: request.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            stream: false,
        }
    }

    /// Convert a chat completions response to LlmResponse.
    fn convert_response(&self, request: &LlmRequest, response: ChatResponse) -> AppResult<LlmResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AppError::Llm(ServiceFailure::malformed(
                    "Groq response contained no message content",
                ))
            })?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let model = if response.model.is_empty() {
            request.model.clone()
        } else {
            response.model
        };

        Ok(LlmResponse {
            content,
            model,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for GroqClient {
    fn provider_name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!(model = %request.model, prompt_len = request.prompt.len(), "Sending completion request to Groq");

        let chat_request = self.to_chat_request(request);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| AppError::Llm(ServiceFailure::from_reqwest("Failed to send request to Groq", &e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(ServiceFailure::from_status(
                "Groq",
                status,
                &error_text,
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            AppError::Llm(ServiceFailure::from_reqwest("Failed to read Groq response", &e))
        })?;

        let converted = self.convert_response(request, chat_response)?;

        tracing::debug!(
            "Groq token usage - Prompt: {}, Completion: {}, Total: {}",
            converted.usage.prompt_tokens,
            converted.usage.completion_tokens,
            converted.usage.total_tokens
        );

        Ok(converted)
    }
}
