//! Embedding provider implementations.

#[cfg(feature = "fastembed")]
pub mod fastembed_engine;
pub mod mock;
pub mod ollama;

#[cfg(feature = "fastembed")]
pub use fastembed_engine::FastEmbedProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
