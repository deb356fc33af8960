//! Embedding providers.
//!
//! Turns query text into vectors for the vector index. Only the vector
//! store calls into this module.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
