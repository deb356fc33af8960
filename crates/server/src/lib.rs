//! MedAssist HTTP server.
//!
//! Two routes: `GET /` serves the chat page and `POST /get` answers one
//! question. Failures are answered as text with status 200 so the chat
//! page can show them like any other reply.

pub mod routes;
pub mod shutdown;

use medassist_knowledge::RagPipeline;
use std::sync::Arc;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(pipeline: RagPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub use routes::create_router;
