//! RAG pipeline types.

use medassist_core::{AppError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use thiserror::Error;

/// Number of passages retrieved when the caller does not say otherwise.
pub const DEFAULT_TOP_K: usize = 10;

/// Reply given for an empty question.
pub const EMPTY_QUESTION_MESSAGE: &str = "Please enter a message.";

/// Prefix of every reply that reports a failed stage.
pub const ERROR_REPLY_PREFIX: &str = "An error occurred";

/// How many passages to retrieve. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct TopK(NonZeroUsize);

impl TopK {
    /// Returns `None` for zero.
    pub fn new(k: usize) -> Option<Self> {
        NonZeroUsize::new(k).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for TopK {
    fn default() -> Self {
        Self(NonZeroUsize::MIN.saturating_add(DEFAULT_TOP_K - 1))
    }
}

impl TryFrom<usize> for TopK {
    type Error = String;

    fn try_from(k: usize) -> Result<Self, Self::Error> {
        Self::new(k).ok_or_else(|| "top_k must be a positive integer".to_string())
    }
}

impl From<TopK> for usize {
    fn from(k: TopK) -> Self {
        k.get()
    }
}

impl fmt::Display for TopK {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stage, used to tag failures and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Rewriting,
    Retrieving,
    Synthesizing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rewriting => "rewriting",
            Self::Retrieving => "retrieving",
            Self::Synthesizing => "synthesizing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the pipeline produced no answer.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The question was empty. No service was called.
    #[error("Question is empty")]
    EmptyQuestion,

    /// A stage failed; later stages did not run.
    #[error("{stage} failed: {source}")]
    Stage { stage: Stage, source: AppError },
}

impl PipelineError {
    pub fn stage(stage: Stage) -> impl FnOnce(AppError) -> Self {
        move |source| Self::Stage { stage, source }
    }

    /// Kind of the underlying service error, if a stage failed.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::EmptyQuestion => None,
            Self::Stage { source, .. } => Some(source.kind()),
        }
    }

    /// Whether asking again later could succeed.
    pub fn is_transient(&self) -> bool {
        self.kind().is_some_and(|kind| kind.is_transient())
    }

    /// Text shown to the person asking.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyQuestion => EMPTY_QUESTION_MESSAGE.to_string(),
            Self::Stage { source, .. } => format!("{}: {}", ERROR_REPLY_PREFIX, source),
        }
    }
}
