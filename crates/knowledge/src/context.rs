//! Application context: every external client, built once at startup.

use crate::embeddings::create_provider;
use crate::rag::TopK;
use crate::store::VectorStore;
use crate::vector_index::create_index;
use medassist_core::{AppConfig, AppError, AppResult};
use medassist_llm::{create_client, LlmClient};
use medassist_prompt::PromptSet;
use std::sync::Arc;
use std::time::Duration;

/// Clients and settings shared by all requests.
///
/// Construct it with [`AppContext::from_config`] in the binary, or fill the
/// fields directly to inject fakes.
#[derive(Clone)]
pub struct AppContext {
    pub llm: Arc<dyn LlmClient>,
    pub store: VectorStore,
    pub prompts: Arc<PromptSet>,

    /// Completion model used for both completion calls
    pub model: String,

    pub default_top_k: TopK,
}

impl AppContext {
    /// Build every client from configuration.
    ///
    /// Fails on the first client that cannot be created or reached.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let default_top_k = TopK::new(config.top_k)
            .ok_or_else(|| AppError::Config("top_k must be at least 1".to_string()))?;

        let prompts = Arc::new(PromptSet::load(config.prompts_dir.as_deref())?);
        let llm = create_client(&config.llm, timeout)?;
        let embedder = create_provider(&config.embedding, timeout).await?;
        let index = create_index(&config.vector, timeout).await?;
        let store = VectorStore::checked(embedder, index)?;

        tracing::info!(
            llm = %config.llm.provider,
            model = %config.llm.model,
            embedding = %config.embedding.provider,
            vector = %config.vector.provider,
            top_k = default_top_k.get(),
            "Application context ready"
        );

        Ok(Self {
            llm,
            store,
            prompts,
            model: config.llm.model.clone(),
            default_top_k,
        })
    }
}
