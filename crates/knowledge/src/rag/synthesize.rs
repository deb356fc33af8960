//! Grounded answer synthesis.

use medassist_core::AppResult;
use medassist_llm::{LlmClient, LlmRequest};
use medassist_prompt::PromptSet;
use std::sync::Arc;

/// Asks the completion service to answer from the retrieved context only.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptSet>,
    model: String,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptSet>, model: impl Into<String>) -> Self {
        Self {
            llm,
            prompts,
            model: model.into(),
        }
    }

    /// Answer `question` from `context`. The reply is returned unmodified.
    pub async fn synthesize(&self, question: &str, context: &str) -> AppResult<String> {
        let prompt = self.prompts.answer_prompt(question, context)?;

        tracing::debug!(
            prompt = %prompt.metadata.source_prompt_id,
            prompt_len = prompt.text.len(),
            context_len = context.len(),
            "Synthesizing answer"
        );

        let request = LlmRequest::new(prompt.text, self.model.as_str());
        let response = self.llm.complete(&request).await?;

        tracing::debug!(
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            answer_len = response.content.len(),
            "Answer received"
        );

        Ok(response.content)
    }
}
