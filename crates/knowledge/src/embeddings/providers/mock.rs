//! Deterministic embedding provider for development and tests.

use crate::embeddings::provider::EmbeddingProvider;
use medassist_core::AppResult;
use std::collections::HashMap;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of", "in",
    "and", "or", "but", "with", "by", "from", "this", "that", "what", "how", "why", "does",
    "can", "its", "it",
];

/// Hashes words and character trigrams into a fixed-width unit vector.
///
/// Texts that share vocabulary land close together under cosine
/// similarity, which is enough to exercise retrieval without a model.
#[derive(Debug, Clone)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn bucket(&self, token: &str, seed: u64) -> usize {
        let hash = token
            .bytes()
            .fold(seed, |acc, b| acc.wrapping_mul(seed).wrapping_add(u64::from(b)));
        (hash % self.dimensions as u64) as usize
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        let lower = text.to_lowercase();
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        {
            *counts.entry(word).or_insert(0) += 1;
        }

        for (word, count) in counts {
            let weight = count as f32;
            vector[self.bucket(word, 31)] += weight;

            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(&trigram, 37)] += weight.sqrt();
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}
