//! Query rewriting.
//!
//! Users ask loosely; the vector index answers best to a short, specific
//! medical query. One completion call turns the former into the latter.

use medassist_core::AppResult;
use medassist_llm::{LlmClient, LlmRequest};
use medassist_prompt::PromptSet;
use std::sync::Arc;

pub struct QueryRewriter {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
    model: String,
}

impl QueryRewriter {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptSet>, model: impl Into<String>) -> Self {
        Self {
            llm,
            prompts,
            model: model.into(),
        }
    }

    /// Rewrite `question` into a retrieval query.
    ///
    /// The reply is trimmed and otherwise used as-is, even when empty.
    pub async fn rewrite(&self, question: &str) -> AppResult<String> {
        let prompt = self.prompts.rewrite_prompt(question)?;
        let request = LlmRequest::new(prompt.text, self.model.as_str());

        let response = self.llm.complete(&request).await?;
        let rewritten = response.content.trim().to_string();

        tracing::debug!(
            provider = self.llm.provider_name(),
            question_len = question.len(),
            rewritten = %rewritten,
            "Rewrote question"
        );

        Ok(rewritten)
    }
}
