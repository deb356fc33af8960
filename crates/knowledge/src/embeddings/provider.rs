//! Embedding provider trait and factory.

use super::providers::{MockProvider, OllamaProvider};
use medassist_core::config::EmbeddingSettings;
use medassist_core::{AppError, AppResult, ServiceFailure};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get provider name (e.g., "mock", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results.pop().ok_or_else(|| {
            AppError::Embedding(ServiceFailure::malformed("No embedding returned"))
        })
    }
}

/// Create an embedding provider based on configuration.
///
/// Remote providers are probed once so an unreachable service or a
/// dimension mismatch fails startup instead of the first request.
pub async fn create_provider(
    settings: &EmbeddingSettings,
    timeout: Duration,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    tracing::debug!(
        "Creating embedding provider: provider={}, model={}, dimensions={}",
        settings.provider,
        settings.model,
        settings.dimensions
    );

    match settings.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(settings.dimensions))),

        "ollama" => {
            let provider = OllamaProvider::new(settings, timeout)?;
            provider.verify_connection().await?;
            Ok(Arc::new(provider))
        }

        #[cfg(feature = "fastembed")]
        "fastembed" => {
            let provider = super::providers::FastEmbedProvider::load(settings).await?;
            Ok(Arc::new(provider))
        }

        #[cfg(not(feature = "fastembed"))]
        "fastembed" => Err(AppError::Config(
            "Embedding provider 'fastembed' requires building with the `fastembed` feature"
                .to_string(),
        )),

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, fastembed, mock",
            other
        ))),
    }
}
