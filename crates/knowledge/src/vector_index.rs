//! Vector index abstraction.
//!
//! Defines a trait for provider-agnostic nearest-neighbour search and the
//! factory that builds the configured backend.

use crate::memory_index::InMemoryIndex;
use crate::pinecone::PineconeIndex;
use medassist_core::config::VectorSettings;
use medassist_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    /// Record identifier in the index
    pub id: String,

    /// Similarity score, higher is closer
    pub score: f32,

    /// Passage text stored with the vector
    pub text: String,
}

/// Trait for vector index backends.
///
/// Implementations return at most `top_k` matches ordered by descending
/// similarity. An empty index yields an empty vector, not an error.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name (e.g., "pinecone", "memory")
    fn backend_name(&self) -> &str;

    /// Vector width the index was created with, when known.
    fn dimensions(&self) -> Option<usize> {
        None
    }

    /// Search for the `top_k` records closest to `vector`.
    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<ScoredMatch>>;
}

/// Create the configured vector index backend.
///
/// Pinecone resolves its data-plane host here, so an unknown index or a
/// rejected key fails startup.
pub async fn create_index(
    settings: &VectorSettings,
    timeout: Duration,
) -> AppResult<Arc<dyn VectorIndex>> {
    match settings.provider.as_str() {
        "pinecone" => {
            let index = PineconeIndex::connect(settings, timeout).await?;
            Ok(Arc::new(index))
        }
        "memory" => {
            tracing::warn!("Using an empty in-memory vector index; answers will have no context");
            Ok(Arc::new(InMemoryIndex::new()))
        }
        other => Err(AppError::Config(format!(
            "Unknown vector provider: '{}'. Supported providers: pinecone, memory",
            other
        ))),
    }
}
