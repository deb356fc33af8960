//! Text-in, passages-out similarity search.

use crate::embeddings::EmbeddingProvider;
use crate::vector_index::{ScoredMatch, VectorIndex};
use medassist_core::{AppError, AppResult};
use std::sync::Arc;

/// Pairs an embedding provider with the vector index it was built for.
#[derive(Clone)]
pub struct VectorStore {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl VectorStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Like [`VectorStore::new`], but rejects an embedder whose vector width
    /// differs from the one the index reports.
    pub fn checked(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> AppResult<Self> {
        if let Some(index_dims) = index.dimensions() {
            if index_dims != embedder.dimensions() {
                return Err(AppError::Config(format!(
                    "Embedding model '{}' produces {} dimensions but the {} index expects {}",
                    embedder.model_name(),
                    embedder.dimensions(),
                    index.backend_name(),
                    index_dims
                )));
            }
        }
        Ok(Self::new(embedder, index))
    }

    /// Embed `query` and return up to `k` nearest passages, closest first.
    pub async fn similarity_search(&self, query: &str, k: usize) -> AppResult<Vec<ScoredMatch>> {
        let vector = self.embedder.embed(query).await?;
        let matches = self.index.query(&vector, k).await?;

        tracing::debug!(
            embedder = self.embedder.provider_name(),
            index = self.index.backend_name(),
            k,
            found = matches.len(),
            "Similarity search"
        );

        Ok(matches)
    }
}
