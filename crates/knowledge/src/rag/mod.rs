//! Retrieval-augmented answering.
//!
//! Three stages share one completion client and one vector store:
//! [`QueryRewriter`], [`ContextRetriever`] and [`AnswerSynthesizer`].
//! [`RagPipeline`] runs them in order.

pub mod pipeline;
pub mod retrieve;
pub mod rewrite;
pub mod synthesize;
pub mod types;

pub use pipeline::RagPipeline;
pub use retrieve::{join_context, ContextRetriever};
pub use rewrite::QueryRewriter;
pub use synthesize::AnswerSynthesizer;
pub use types::{
    PipelineError, Stage, TopK, DEFAULT_TOP_K, EMPTY_QUESTION_MESSAGE, ERROR_REPLY_PREFIX,
};
