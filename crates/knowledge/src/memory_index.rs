//! Brute-force in-memory vector index for tests and local development.

use crate::vector_index::{ScoredMatch, VectorIndex};
use medassist_core::{AppError, AppResult, ServiceFailure};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct IndexEntry {
    id: String,
    vector: Vec<f32>,
    text: String,
}

/// Vector index held entirely in memory.
///
/// Scores every stored vector by cosine similarity. Records with equal
/// scores keep their insertion order.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    entries: RwLock<Vec<IndexEntry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record with the same id.
    pub async fn upsert(&self, id: impl Into<String>, vector: Vec<f32>, text: impl Into<String>) {
        let entry = IndexEntry {
            id: id.into(),
            vector,
            text: text.into(),
        };

        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl VectorIndex for InMemoryIndex {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<ScoredMatch>> {
        let entries = self.entries.read().await;

        if let Some(entry) = entries.iter().find(|e| e.vector.len() != vector.len()) {
            return Err(AppError::Retrieval(ServiceFailure::malformed(format!(
                "Query vector has {} dimensions but record '{}' has {}",
                vector.len(),
                entry.id,
                entry.vector.len()
            ))));
        }

        let mut results: Vec<ScoredMatch> = entries
            .iter()
            .map(|entry| ScoredMatch {
                id: entry.id.clone(),
                score: cosine_similarity(vector, &entry.vector),
                text: entry.text.clone(),
            })
            .collect();

        // Stable sort keeps insertion order for ties
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        tracing::debug!(candidates = entries.len(), returned = results.len(), "In-memory query");
        Ok(results)
    }
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
