//! In-process embeddings with `fastembed` (ONNX runtime).
//!
//! Loads a sentence-transformers model once and serves every request from
//! it. Inference is CPU bound and runs on the blocking thread pool.

use crate::embeddings::provider::EmbeddingProvider;
use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use medassist_core::config::EmbeddingSettings;
use medassist_core::{AppError, AppResult, ErrorKind, ServiceFailure};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Embedding provider backed by a single shared `TextEmbedding`.
pub struct FastEmbedProvider {
    model_label: String,
    dimensions: usize,
    inner: Arc<Mutex<TextEmbedding>>,
}

/// Map the configured model to a fastembed model code.
fn resolve_model(label: &str) -> &str {
    match label {
        "all-minilm" | "all-MiniLM-L6-v2" => "sentence-transformers/all-MiniLM-L6-v2",
        other => other,
    }
}

fn failure(message: String) -> AppError {
    AppError::Embedding(ServiceFailure::new(ErrorKind::Other, message))
}

impl FastEmbedProvider {
    /// Load (downloading on first use) the configured model.
    pub async fn load(settings: &EmbeddingSettings) -> AppResult<Self> {
        let label = settings.model.trim().to_string();
        let code = resolve_model(&label).to_string();

        let embedding_model = EmbeddingModel::from_str(&code).map_err(|e| {
            AppError::Config(format!("Unknown fastembed model '{}': {}", label, e))
        })?;

        let dimensions = TextEmbedding::get_model_info(&embedding_model)
            .map_err(|e| {
                AppError::Config(format!("No metadata for fastembed model '{}': {}", label, e))
            })?
            .dim;

        if dimensions != settings.dimensions {
            return Err(AppError::Config(format!(
                "fastembed model '{}' produces {} dimensions, configured {}",
                label, dimensions, settings.dimensions
            )));
        }

        tracing::info!("Loading fastembed model {}", code);
        let text_embedding = tokio::task::spawn_blocking(move || {
            TextEmbedding::try_new(TextInitOptions::new(embedding_model))
        })
        .await
        .map_err(|e| failure(format!("fastembed loader panicked: {}", e)))?
        .map_err(|e| failure(format!("Failed to initialise fastembed model '{}': {}", code, e)))?;

        Ok(Self {
            model_label: label,
            dimensions,
            inner: Arc::new(Mutex::new(text_embedding)),
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn provider_name(&self) -> &str {
        "fastembed"
    }

    fn model_name(&self) -> &str {
        &self.model_label
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = inner
                .lock()
                .map_err(|_| failure("fastembed model lock poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| failure(format!("fastembed inference failed: {}", e)))
        })
        .await
        .map_err(|e| failure(format!("fastembed worker panicked: {}", e)))?
    }
}
