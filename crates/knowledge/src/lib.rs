//! Retrieval and answering for MedAssist.
//!
//! Embeds questions, searches a vector index for supporting passages and
//! runs the rewrite → retrieve → synthesize pipeline.

pub mod context;
pub mod embeddings;
pub mod memory_index;
pub mod pinecone;
pub mod rag;
pub mod store;
pub mod vector_index;

// Re-export commonly used types
pub use context::AppContext;
pub use embeddings::{create_provider, EmbeddingProvider};
pub use memory_index::InMemoryIndex;
pub use pinecone::PineconeIndex;
pub use rag::{PipelineError, RagPipeline, Stage, TopK};
pub use store::VectorStore;
pub use vector_index::{create_index, ScoredMatch, VectorIndex};
