//! Context retrieval.

use crate::rag::types::TopK;
use crate::store::VectorStore;
use medassist_core::AppResult;

/// Separator placed between passages in the answer prompt.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

pub struct ContextRetriever {
    store: VectorStore,
}

impl ContextRetriever {
    pub fn new(store: VectorStore) -> Self {
        Self { store }
    }

    /// Fetch up to `k` passages for `query`, most similar first.
    ///
    /// Only passage text is kept. An empty index yields an empty list.
    pub async fn retrieve(&self, query: &str, k: TopK) -> AppResult<Vec<String>> {
        let matches = self.store.similarity_search(query, k.get()).await?;

        if let Some(best) = matches.first() {
            tracing::debug!(k = k.get(), found = matches.len(), best_score = best.score, "Retrieved passages");
        } else {
            tracing::info!(k = k.get(), "No passages matched the query");
        }

        Ok(matches.into_iter().map(|m| m.text).collect())
    }
}

/// Join passages into the context block, keeping their order.
pub fn join_context(passages: &[String]) -> String {
    passages.join(PASSAGE_SEPARATOR)
}
