//! Ollama embedding provider.
//!
//! Sends query text to a local Ollama runtime (`all-minilm` by default,
//! 384 dimensions). Ollama has no batch endpoint, so batches are embedded
//! one text at a time.
//!
//! # Example
//! ```no_run
//! use medassist_core::config::EmbeddingSettings;
//! use medassist_knowledge::embeddings::providers::OllamaProvider;
//! use medassist_knowledge::embeddings::EmbeddingProvider;
//! use std::time::Duration;
//!
//! # async fn run() -> medassist_core::AppResult<()> {
//! let settings = EmbeddingSettings {
//!     provider: "ollama".to_string(),
//!     model: "all-minilm".to_string(),
//!     dimensions: 384,
//!     endpoint: None,
//! };
//!
//! let provider = OllamaProvider::new(&settings, Duration::from_secs(30))?;
//! let embedding = provider.embed("What causes migraines?").await?;
//! assert_eq!(embedding.len(), 384);
//! # Ok(())
//! # }
//! ```

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use medassist_core::config::EmbeddingSettings;
use medassist_core::{AppError, AppResult, ServiceFailure};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

/// Ollama API base URL when none is configured
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Ollama embedding provider using the local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Error body returned by Ollama on failure
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider from settings. No request is made.
    pub fn new(settings: &EmbeddingSettings, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Config(format!("Failed to create HTTP client for Ollama: {}", e))
        })?;

        let base_url = settings
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            model: settings.model.clone(),
            dimensions: settings.dimensions,
        })
    }

    /// Verify Ollama is reachable and the model yields the configured width.
    #[instrument(skip(self), fields(model = %self.model))]
    pub async fn verify_connection(&self) -> AppResult<()> {
        debug!("Verifying Ollama connection at {}", self.base_url);

        match self.embed_single("connection check").await {
            Ok(_) => {
                debug!("Ollama connection verified, model '{}' ready", self.model);
                Ok(())
            }
            Err(e) => {
                error!("Failed to reach Ollama embeddings: {}", e);
                let kind = e.kind();
                Err(AppError::Embedding(ServiceFailure::new(
                    kind,
                    format!(
                        "Ollama not available at {} ({}). Ensure Ollama is running and model '{}' is installed. Run: ollama pull {}",
                        self.base_url, e, self.model, self.model
                    ),
                )))
            }
        }
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::Embedding(ServiceFailure::from_reqwest(
                    "Failed to send request to Ollama",
                    &e,
                ))
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            // Ollama wraps most errors as {"error": "..."}
            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|body| body.error)
                .unwrap_or(error_text);

            return Err(AppError::Embedding(ServiceFailure::from_status(
                "Ollama", status, &detail,
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::Embedding(ServiceFailure::from_reqwest("Failed to read Ollama response", &e))
        })?;

        // Ollama answers an empty prompt with an empty vector
        if body.embedding.is_empty() {
            let message = if text.is_empty() {
                "Ollama returned no embedding for an empty query"
            } else {
                "Ollama returned an empty embedding"
            };
            return Err(AppError::Embedding(ServiceFailure::malformed(message)));
        }

        if body.embedding.len() != self.dimensions {
            return Err(AppError::Embedding(ServiceFailure::malformed(format!(
                "Unexpected embedding dimensions: got {}, expected {}",
                body.embedding.len(),
                self.dimensions
            ))));
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, text), fields(provider = "ollama", model = %self.model))]
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed_single(text).await
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama"))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_single(text).await?);
        }
        Ok(embeddings)
    }
}
