//! Route handlers.

use crate::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use medassist_knowledge::TopK;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

const CHAT_PAGE: &str = include_str!("../static/chat.html");

/// Form body of `POST /get`.
#[derive(Debug, Deserialize)]
pub struct ChatForm {
    pub msg: String,

    /// Overrides the configured number of passages; blank means default
    #[serde(default)]
    pub top_k: Option<String>,
}

/// Read the optional `top_k` field. Absent or blank selects the default.
fn parse_top_k(raw: Option<&str>, default: TopK) -> Result<TopK, &'static str> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<usize>()
            .ok()
            .and_then(TopK::new)
            .ok_or("top_k must be a positive integer"),
    }
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/get", post(chat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn chat(State(state): State<AppState>, Form(form): Form<ChatForm>) -> Response {
    let k = match parse_top_k(form.top_k.as_deref(), state.pipeline.default_top_k()) {
        Ok(k) => k,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    let reply = state.pipeline.respond(&form.msg, k).await;

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        reply,
    )
        .into_response()
}
