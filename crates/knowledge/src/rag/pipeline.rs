//! Answer pipeline orchestration.
//!
//! question → rewrite → retrieve → join context → synthesize → answer.
//! Each step runs once, in order, and the first failure ends the request.

use crate::context::AppContext;
use crate::rag::retrieve::{join_context, ContextRetriever};
use crate::rag::rewrite::QueryRewriter;
use crate::rag::synthesize::AnswerSynthesizer;
use crate::rag::types::{PipelineError, Stage, TopK};
use std::time::Instant;

/// Retrieval-augmented answering over the configured services.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct RagPipeline {
    rewriter: QueryRewriter,
    retriever: ContextRetriever,
    synthesizer: AnswerSynthesizer,
    default_top_k: TopK,
}

impl RagPipeline {
    pub fn new(context: &AppContext) -> Self {
        Self {
            rewriter: QueryRewriter::new(
                context.llm.clone(),
                context.prompts.clone(),
                context.model.clone(),
            ),
            retriever: ContextRetriever::new(context.store.clone()),
            synthesizer: AnswerSynthesizer::new(
                context.llm.clone(),
                context.prompts.clone(),
                context.model.clone(),
            ),
            default_top_k: context.default_top_k,
        }
    }

    pub fn default_top_k(&self) -> TopK {
        self.default_top_k
    }

    /// Answer `question` from the `k` most relevant passages.
    ///
    /// An empty question fails fast without calling any service. Any other
    /// text, whitespace included, goes through the stages as given.
    pub async fn answer(&self, question: &str, k: TopK) -> Result<String, PipelineError> {
        if question.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }

        let started = Instant::now();
        tracing::info!(k = k.get(), question_len = question.len(), "Answering question");

        let query = self
            .rewriter
            .rewrite(question)
            .await
            .map_err(PipelineError::stage(Stage::Rewriting))?;

        let passages = self
            .retriever
            .retrieve(&query, k)
            .await
            .map_err(PipelineError::stage(Stage::Retrieving))?;

        let context = join_context(&passages);

        let answer = self
            .synthesizer
            .synthesize(question, &context)
            .await
            .map_err(PipelineError::stage(Stage::Synthesizing))?;

        tracing::info!(
            passages = passages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Answered question"
        );

        Ok(answer)
    }

    /// Like [`RagPipeline::answer`], with failures rendered as reply text.
    pub async fn respond(&self, question: &str, k: TopK) -> String {
        match self.answer(question, k).await {
            Ok(answer) => answer,
            Err(err) => {
                match &err {
                    PipelineError::EmptyQuestion => {
                        tracing::debug!("Rejected empty question");
                    }
                    PipelineError::Stage { stage, source } => {
                        tracing::error!(
                            stage = %stage,
                            kind = %source.kind(),
                            transient = source.is_transient(),
                            error = %source,
                            "Pipeline stage failed"
                        );
                    }
                }
                err.user_message()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingProvider;
    use crate::store::VectorStore;
    use crate::vector_index::{ScoredMatch, VectorIndex};
    use medassist_core::{AppError, AppResult, ErrorKind, ServiceFailure};
    use medassist_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
    use medassist_prompt::PromptSet;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type CallLog = Arc<Mutex<Vec<String>>>;

    /// Replies from a script, in order, and records every prompt.
    struct ScriptedLlm {
        log: CallLog,
        replies: Mutex<VecDeque<AppResult<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.log.lock().unwrap().push("complete".to_string());
            self.prompts.lock().unwrap().push(request.prompt.clone());

            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("completion called more often than scripted");

            reply.map(|content| LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    struct RecordingEmbedder {
        log: CallLog,
        texts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for RecordingEmbedder {
        fn provider_name(&self) -> &str {
            "recording"
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            self.log.lock().unwrap().push("embed".to_string());
            self.texts.lock().unwrap().extend(texts.iter().cloned());
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct CannedIndex {
        log: CallLog,
        result: Mutex<Option<AppResult<Vec<ScoredMatch>>>>,
        requested_k: Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl VectorIndex for CannedIndex {
        fn backend_name(&self) -> &str {
            "canned"
        }

        async fn query(&self, _vector: &[f32], top_k: usize) -> AppResult<Vec<ScoredMatch>> {
            self.log.lock().unwrap().push("query".to_string());
            self.requested_k.lock().unwrap().push(top_k);
            self.result.lock().unwrap().take().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    struct Harness {
        pipeline: RagPipeline,
        log: CallLog,
        llm: Arc<ScriptedLlm>,
        embedder: Arc<RecordingEmbedder>,
        index: Arc<CannedIndex>,
    }

    impl Harness {
        fn new(replies: Vec<AppResult<String>>, search: AppResult<Vec<ScoredMatch>>) -> Self {
            let log: CallLog = Arc::new(Mutex::new(Vec::new()));
            let llm = Arc::new(ScriptedLlm {
                log: log.clone(),
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            });
            let embedder = Arc::new(RecordingEmbedder {
                log: log.clone(),
                texts: Mutex::new(Vec::new()),
            });
            let index = Arc::new(CannedIndex {
                log: log.clone(),
                result: Mutex::new(Some(search)),
                requested_k: Mutex::new(Vec::new()),
            });

            let context = AppContext {
                llm: llm.clone(),
                store: VectorStore::new(embedder.clone(), index.clone()),
                prompts: Arc::new(PromptSet::load(None).unwrap()),
                model: "test-model".to_string(),
                default_top_k: TopK::default(),
            };

            Self {
                pipeline: RagPipeline::new(&context),
                log,
                llm,
                embedder,
                index,
            }
        }

        fn calls(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn prompts(&self) -> Vec<String> {
            self.llm.prompts.lock().unwrap().clone()
        }
    }

    fn passages(texts: &[&str]) -> AppResult<Vec<ScoredMatch>> {
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, text)| ScoredMatch {
                id: format!("p{}", i),
                score: 0.9 - i as f32 * 0.1,
                text: text.to_string(),
            })
            .collect())
    }

    fn ok(text: &str) -> AppResult<String> {
        Ok(text.to_string())
    }

    const MIGRAINE_PASSAGES: [&str; 3] = [
        "Migraine is a neurological condition causing recurrent headaches.",
        "Attacks often come with nausea and sensitivity to light.",
        "Some people experience an aura before the headache.",
    ];

    #[tokio::test]
    async fn test_migraine_question_end_to_end() {
        let harness = Harness::new(
            vec![
                ok("  migraine definition and symptoms\n"),
                ok("A migraine is a type of headache that often comes with nausea."),
            ],
            passages(&MIGRAINE_PASSAGES),
        );

        let reply = harness
            .pipeline
            .respond("What is a migraine?", TopK::default())
            .await;

        assert_eq!(
            reply,
            "A migraine is a type of headache that often comes with nausea."
        );
        assert_eq!(harness.calls(), vec!["complete", "embed", "query", "complete"]);
        assert_eq!(*harness.index.requested_k.lock().unwrap(), vec![10]);

        // Retrieval uses the trimmed rewrite, not the raw question
        assert_eq!(
            *harness.embedder.texts.lock().unwrap(),
            vec!["migraine definition and symptoms".to_string()]
        );

        let prompts = harness.prompts();
        assert!(prompts[0].contains("User question: \"What is a migraine?\""));
        assert!(prompts[1].contains(&format!(
            "Context:\n{}\n\n{}\n\n{}\n\nUser Question: What is a migraine?\nAnswer:",
            MIGRAINE_PASSAGES[0], MIGRAINE_PASSAGES[1], MIGRAINE_PASSAGES[2]
        )));
        assert!(prompts[1].starts_with("You are a professional medical assistant."));
    }

    #[tokio::test]
    async fn test_empty_question_calls_nothing() {
        let harness = Harness::new(vec![], passages(&[]));

        assert_eq!(
            harness.pipeline.respond("", TopK::default()).await,
            "Please enter a message."
        );
        assert!(matches!(
            harness.pipeline.answer("", TopK::default()).await,
            Err(PipelineError::EmptyQuestion)
        ));
        assert!(harness.calls().is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_question_is_answered() {
        let harness = Harness::new(vec![ok("general health"), ok("answer")], passages(&["p"]));

        let reply = harness.pipeline.respond("  \n\t", TopK::default()).await;

        assert_eq!(reply, "answer");
        assert_eq!(harness.calls(), vec!["complete", "embed", "query", "complete"]);
        assert!(harness.prompts()[0].contains("User question: \"  \n\t\""));
    }

    #[tokio::test]
    async fn test_synthesis_timeout_becomes_error_reply() {
        let timeout = AppError::Llm(ServiceFailure::new(
            ErrorKind::Timeout,
            "Failed to send request to Groq: operation timed out",
        ));
        let harness = Harness::new(
            vec![ok("migraine symptoms"), Err(timeout)],
            passages(&MIGRAINE_PASSAGES),
        );

        let reply = harness
            .pipeline
            .respond("What is a migraine?", TopK::default())
            .await;

        assert!(reply.starts_with("An error occurred"));
        assert!(reply.contains("operation timed out"));
        assert_eq!(harness.calls(), vec!["complete", "embed", "query", "complete"]);
    }

    #[tokio::test]
    async fn test_stage_failure_is_tagged() {
        let timeout = AppError::Llm(ServiceFailure::new(ErrorKind::Timeout, "timed out"));
        let harness = Harness::new(vec![ok("q"), Err(timeout)], passages(&["p"]));

        let err = harness
            .pipeline
            .answer("What is a migraine?", TopK::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Stage {
                stage: Stage::Synthesizing,
                ..
            }
        ));
        assert_eq!(err.kind(), Some(ErrorKind::Timeout));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_pipeline_keeps_serving_after_failure() {
        let harness = Harness::new(
            vec![
                Err(AppError::Llm(ServiceFailure::new(
                    ErrorKind::RateLimited,
                    "Groq API error (429): slow down",
                ))),
                ok("rewritten"),
                ok("Second answer"),
            ],
            passages(&["passage"]),
        );

        let first = harness.pipeline.respond("first", TopK::default()).await;
        assert!(first.contains("An error occurred"));
        assert!(first.contains("slow down"));

        let second = harness.pipeline.respond("second", TopK::default()).await;
        assert_eq!(second, "Second answer");
    }

    #[tokio::test]
    async fn test_rewrite_failure_skips_retrieval() {
        let harness = Harness::new(
            vec![Err(AppError::Llm(ServiceFailure::new(
                ErrorKind::Unauthorized,
                "Groq API error (401): Invalid API Key",
            )))],
            passages(&MIGRAINE_PASSAGES),
        );

        let err = harness
            .pipeline
            .answer("What is a migraine?", TopK::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Stage {
                stage: Stage::Rewriting,
                ..
            }
        ));
        assert!(!err.is_transient());
        assert_eq!(harness.calls(), vec!["complete"]);
    }

    #[tokio::test]
    async fn test_retrieval_failure_skips_synthesis() {
        let harness = Harness::new(
            vec![ok("migraine")],
            Err(AppError::Retrieval(ServiceFailure::new(
                ErrorKind::Unavailable,
                "Pinecone API error (503): overloaded",
            ))),
        );

        let reply = harness
            .pipeline
            .respond("What is a migraine?", TopK::default())
            .await;

        assert_eq!(
            reply,
            "An error occurred: Retrieval error: Pinecone API error (503): overloaded"
        );
        assert_eq!(harness.calls(), vec!["complete", "embed", "query"]);
    }

    #[tokio::test]
    async fn test_zero_passages_still_synthesizes() {
        let harness = Harness::new(
            vec![ok("rare condition"), ok("I don't know")],
            passages(&[]),
        );

        let reply = harness
            .pipeline
            .respond("What is Xyzzy syndrome?", TopK::default())
            .await;

        assert_eq!(reply, "I don't know");
        assert!(harness.prompts()[1].contains("Context:\n\n\nUser Question: What is Xyzzy syndrome?"));
        assert_eq!(harness.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_fewer_passages_than_k() {
        let harness = Harness::new(vec![ok("query"), ok("answer")], passages(&["A", "B"]));

        let k = TopK::new(5).unwrap();
        harness.pipeline.respond("question", k).await;

        assert_eq!(*harness.index.requested_k.lock().unwrap(), vec![5]);
        assert!(harness.prompts()[1].contains("Context:\nA\n\nB\n\nUser Question: question"));
    }

    #[tokio::test]
    async fn test_empty_rewrite_is_passed_on() {
        let harness = Harness::new(vec![ok("   "), ok("answer")], passages(&[]));

        harness.pipeline.respond("question", TopK::default()).await;

        assert_eq!(*harness.embedder.texts.lock().unwrap(), vec![String::new()]);
    }

    #[tokio::test]
    async fn test_answer_is_returned_unmodified() {
        let raw = "  **Migraine**: <b>headache</b> disorder.\n\n";
        let harness = Harness::new(vec![ok("q"), ok(raw)], passages(&["p"]));

        let answer = harness
            .pipeline
            .answer("What is a migraine?", TopK::default())
            .await
            .unwrap();
        assert_eq!(answer, raw);
    }

    #[tokio::test]
    async fn test_synthesis_uses_original_question() {
        let harness = Harness::new(
            vec![ok("hypertension causes"), ok("answer")],
            passages(&["p"]),
        );

        harness.pipeline.respond("why is my bp high??", TopK::default()).await;

        let prompts = harness.prompts();
        assert!(prompts[1].contains("User Question: why is my bp high??"));
        assert!(!prompts[1].contains("hypertension causes"));
    }
}
