//! HTTP-level tests for the chat routes.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use medassist_core::{AppError, AppResult, ErrorKind, ServiceFailure};
use medassist_knowledge::embeddings::providers::MockProvider;
use medassist_knowledge::{
    AppContext, EmbeddingProvider, InMemoryIndex, PineconeIndex, RagPipeline, TopK, VectorStore,
};
use medassist_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use medassist_prompt::PromptSet;
use medassist_server::{create_router, AppState};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

const ANSWER: &str = "A migraine is a headache disorder with recurring attacks.";

/// Answers the rewrite prompt with a fixed query and the answer prompt
/// with [`ANSWER`], or fails every call.
struct FakeLlm {
    prompts: Mutex<Vec<String>>,
    failure: Option<ErrorKind>,
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.prompts.lock().unwrap().push(request.prompt.clone());

        if let Some(kind) = self.failure {
            return Err(AppError::Llm(ServiceFailure::new(
                kind,
                "Failed to send request to Groq: operation timed out",
            )));
        }

        let content = if request.prompt.contains("Clear question:") {
            "migraine headache aura"
        } else {
            ANSWER
        };

        Ok(LlmResponse {
            content: content.to_string(),
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

struct TestApp {
    router: Router,
    llm: Arc<FakeLlm>,
}

impl TestApp {
    async fn new(failure: Option<ErrorKind>) -> Self {
        let embedder = Arc::new(MockProvider::new(128));
        let index = Arc::new(InMemoryIndex::new());

        for (id, text) in [
            ("m1", "Migraine headaches often come with an aura and nausea."),
            ("m2", "Migraine attacks can last from four hours to three days."),
            ("d1", "Insulin resistance is common in type 2 diabetes."),
        ] {
            let vector = embedder.embed(text).await.unwrap();
            index.upsert(id, vector, text).await;
        }

        Self::with_store(VectorStore::new(embedder, index), failure)
    }

    fn with_store(store: VectorStore, failure: Option<ErrorKind>) -> Self {
        let llm = Arc::new(FakeLlm {
            prompts: Mutex::new(Vec::new()),
            failure,
        });

        let context = AppContext {
            llm: llm.clone(),
            store,
            prompts: Arc::new(PromptSet::load(None).unwrap()),
            model: "llama-3.1-8b-instant".to_string(),
            default_top_k: TopK::default(),
        };

        Self {
            router: create_router(AppState::new(RagPipeline::new(&context))),
            llm,
        }
    }

    async fn post_form(&self, body: &str) -> (StatusCode, Option<String>, String) {
        let request = Request::builder()
            .method("POST")
            .uri("/get")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn prompts(&self) -> Vec<String> {
        self.llm.prompts.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn test_index_serves_chat_page() {
    let app = TestApp::new(None).await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("<title>MedAssist</title>"));
    assert!(html.contains("\"/get\""));
}

#[tokio::test]
async fn test_question_is_answered_as_text() {
    let app = TestApp::new(None).await;

    let (status, content_type, body) = app.post_form("msg=What+is+a+migraine%3F").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/plain"));
    assert_eq!(body, ANSWER);

    let prompts = app.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("User question: \"What is a migraine?\""));
    assert!(prompts[1].contains("Migraine headaches often come with an aura and nausea."));
    assert!(prompts[1].contains("User Question: What is a migraine?"));
}

#[tokio::test]
async fn test_empty_message_prompts_for_input() {
    let app = TestApp::new(None).await;

    let (status, _, body) = app.post_form("msg=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Please enter a message.");
    assert!(app.prompts().is_empty());
}

#[tokio::test]
async fn test_service_failure_is_reported_in_body() {
    let app = TestApp::new(Some(ErrorKind::Timeout)).await;

    let (status, _, body) = app.post_form("msg=What+is+a+migraine%3F").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("An error occurred"));
    assert!(body.contains("operation timed out"));

    // The server keeps answering after a failure
    let (status, _, _) = app.post_form("msg=second").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_top_k_override_limits_context() {
    let app = TestApp::new(None).await;

    let (status, _, body) = app.post_form("msg=migraine+aura&top_k=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ANSWER);

    let answer_prompt = &app.prompts()[1];
    let context = answer_prompt
        .split("Context:\n")
        .nth(1)
        .and_then(|rest| rest.split("\n\nUser Question:").next())
        .unwrap();
    assert!(!context.contains("\n\n"), "expected a single passage, got: {}", context);
}

#[tokio::test]
async fn test_zero_top_k_rejected() {
    let app = TestApp::new(None).await;

    let (status, _, _) = app.post_form("msg=hello&top_k=0").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.prompts().is_empty());
}

#[tokio::test]
async fn test_blank_top_k_uses_default() {
    let app = TestApp::new(None).await;

    let (status, _, body) = app.post_form("msg=migraine+aura&top_k=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ANSWER);
    assert_eq!(app.prompts().len(), 2);
}

#[tokio::test]
async fn test_non_numeric_top_k_rejected() {
    let app = TestApp::new(None).await;

    let (status, _, _) = app.post_form("msg=hello&top_k=ten").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.prompts().is_empty());
}

#[tokio::test]
async fn test_missing_msg_field_rejected() {
    let app = TestApp::new(None).await;

    let (status, _, _) = app.post_form("question=hello").await;

    assert!(status.is_client_error());
    assert!(app.prompts().is_empty());
}

#[tokio::test]
async fn test_vector_search_timeout_is_reported_in_body() {
    let slow = Router::new().route(
        "/query",
        axum::routing::post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "{}"
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, slow).await.unwrap();
    });

    let index =
        PineconeIndex::with_host(&host, "pc-test", "", "text", Duration::from_millis(300)).unwrap();
    let app = TestApp::with_store(
        VectorStore::new(Arc::new(MockProvider::new(128)), Arc::new(index)),
        None,
    );

    let (status, _, body) = app.post_form("msg=What+is+a+migraine%3F").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("An error occurred: "), "{}", body);
    assert!(body.contains("timed out"), "{}", body);

    // Only the rewrite ran; synthesis was skipped
    assert_eq!(app.prompts().len(), 1);
}
