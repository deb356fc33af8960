//! Error types for MedAssist.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! prompt rendering and the three external services (completion,
//! embedding, vector search). Service failures carry an [`ErrorKind`] so
//! callers can tell a rate limit from a malformed response without
//! inspecting message text.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Machine-readable classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid configuration
    Config,
    /// Local I/O failure
    Io,
    /// Connection could not be established or was dropped
    Network,
    /// The service did not answer within the client timeout
    Timeout,
    /// Quota or rate limit rejection
    RateLimited,
    /// Credentials were rejected
    Unauthorized,
    /// The service reported a server-side failure (5xx)
    Unavailable,
    /// The service rejected the request (other non-success status)
    Upstream,
    /// The response body did not have the expected shape
    MalformedResponse,
    /// Prompt template could not be loaded or rendered
    Prompt,
    /// Serialization/deserialization failure
    Serialization,
    /// Anything else
    Other,
}

impl ErrorKind {
    /// Canonical snake_case name, stable for logs and clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Io => "io",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Unauthorized => "unauthorized",
            Self::Unavailable => "unavailable",
            Self::Upstream => "upstream",
            Self::MalformedResponse => "malformed_response",
            Self::Prompt => "prompt",
            Self::Serialization => "serialization",
            Self::Other => "other",
        }
    }

    /// Whether the same request could succeed if sent again later.
    ///
    /// Misconfiguration (bad key, unknown index) is permanent; dropped
    /// connections, timeouts, throttling and 5xx responses are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Unavailable
        )
    }

    /// Classify an HTTP status returned by an external service.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            408 | 504 => Self::Timeout,
            429 => Self::RateLimited,
            500..=599 => Self::Unavailable,
            _ => Self::Upstream,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by (or while talking to) an external service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl ServiceFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Response body could not be understood.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, message)
    }

    /// Build a failure from a non-success HTTP response.
    pub fn from_status(service: &str, status: reqwest::StatusCode, body: &str) -> Self {
        let body = body.trim();
        let body = if body.is_empty() { "Unknown error" } else { body };
        Self::new(
            ErrorKind::from_status(status.as_u16()),
            format!("{} API error ({}): {}", service, status, body),
        )
    }

    /// Build a failure from a reqwest error raised while sending a request
    /// or reading its body.
    ///
    /// reqwest keeps the underlying cause (e.g. "operation timed out") in
    /// the source chain, so the whole chain goes into the message.
    pub fn from_reqwest(context: &str, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_decode() {
            ErrorKind::MalformedResponse
        } else if let Some(status) = err.status() {
            ErrorKind::from_status(status.as_u16())
        } else {
            ErrorKind::Network
        };

        let mut message = format!("{}: {}", context, error_chain(err));
        if kind == ErrorKind::Timeout && !message.contains("timed out") {
            message.push_str(": operation timed out");
        }

        Self::new(kind, message)
    }
}

/// Render an error and its sources as `outer: inner: root`, skipping
/// sources whose text is already included.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Unified error type for MedAssist.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Completion service errors
    #[error("LLM error: {0}")]
    Llm(ServiceFailure),

    /// Embedding service errors
    #[error("Embedding error: {0}")]
    Embedding(ServiceFailure),

    /// Vector search errors
    #[error("Retrieval error: {0}")]
    Retrieval(ServiceFailure),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::Llm(f) | Self::Embedding(f) | Self::Retrieval(f) => f.kind,
            Self::Prompt(_) => ErrorKind::Prompt,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ErrorKind::from_status(401), ErrorKind::Unauthorized);
        assert_eq!(ErrorKind::from_status(403), ErrorKind::Unauthorized);
        assert_eq!(ErrorKind::from_status(429), ErrorKind::RateLimited);
        assert_eq!(ErrorKind::from_status(504), ErrorKind::Timeout);
        assert_eq!(ErrorKind::from_status(503), ErrorKind::Unavailable);
        assert_eq!(ErrorKind::from_status(404), ErrorKind::Upstream);
    }

    #[test]
    fn test_transient_kinds() {
        assert!(ErrorKind::Timeout.is_transient());
        assert!(ErrorKind::RateLimited.is_transient());
        assert!(ErrorKind::Unavailable.is_transient());
        assert!(!ErrorKind::Unauthorized.is_transient());
        assert!(!ErrorKind::MalformedResponse.is_transient());
        assert!(!ErrorKind::Config.is_transient());
    }

    #[test]
    fn test_service_error_display_and_kind() {
        let err = AppError::Retrieval(ServiceFailure::new(
            ErrorKind::Timeout,
            "query timed out after 30s",
        ));
        assert_eq!(err.to_string(), "Retrieval error: query timed out after 30s");
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_transient());
    }

    #[test]
    fn test_from_status_message() {
        let failure =
            ServiceFailure::from_status("Groq", reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(failure.kind, ErrorKind::RateLimited);
        assert!(failure.message.contains("429"));
        assert!(failure.message.contains("Unknown error"));
    }

    #[derive(Debug)]
    struct Layer(&'static str, Option<Box<Layer>>);

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Layer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_deref().map(|l| l as &(dyn std::error::Error + 'static))
        }
    }

    #[test]
    fn test_error_chain_includes_root_cause() {
        let err = Layer(
            "error sending request for url (http://localhost/query)",
            Some(Box::new(Layer(
                "client error (SendRequest)",
                Some(Box::new(Layer("operation timed out", None))),
            ))),
        );
        assert_eq!(
            error_chain(&err),
            "error sending request for url (http://localhost/query): client error (SendRequest): operation timed out"
        );
    }

    #[test]
    fn test_error_chain_skips_repeated_text() {
        let err = Layer("connection refused", Some(Box::new(Layer("refused", None))));
        assert_eq!(error_chain(&err), "connection refused");
    }

    #[tokio::test]
    async fn test_from_reqwest_timeout_mentions_timeout() {
        use tokio::io::AsyncReadExt;

        // Accepts the connection but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        });

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(200))
            .build()
            .unwrap();
        let err = client
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap_err();

        let failure = ServiceFailure::from_reqwest("Failed to send request", &err);
        assert_eq!(failure.kind, ErrorKind::Timeout);
        assert!(failure.message.starts_with("Failed to send request: "));
        assert!(failure.message.contains("timed out"), "{}", failure.message);
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::MalformedResponse).unwrap();
        assert_eq!(json, "\"malformed_response\"");
        assert_eq!(ErrorKind::RateLimited.to_string(), "rate_limited");
    }
}
