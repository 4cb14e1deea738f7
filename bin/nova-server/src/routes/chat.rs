//! HR question answering (`POST /chat`).
//!
//! Canned topics are answered from the resolver's table; everything else is
//! generated by the model. Generation is CPU-bound, so the resolver runs on
//! the blocking thread pool.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::chat::{ChatRequest, ChatResponse, ErrorResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(chat),
    components(schemas(ChatRequest, ChatResponse, ErrorResponse))
)]
pub struct ChatApi;

/// Register the chat route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// Answer one HR question.
#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer produced", body = ChatResponse),
        (status = 400, description = "No question provided or malformed body", body = ErrorResponse),
        (status = 500, description = "Generation failed", body = ErrorResponse),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ServerError> {
    let Json(req) = payload?;
    let question = req.question.unwrap_or_default();
    debug!(question_len = question.len(), "chat request");

    let resolver = Arc::clone(&state.resolver);
    let apologize = state.config.apologize_on_error;
    let resolution = tokio::task::spawn_blocking(move || {
        if apologize {
            resolver.answer_or_apology(&question)
        } else {
            resolver.resolve(&question)
        }
    })
    .await
    .map_err(|e| ServerError::Internal(format!("resolver task failed: {e}")))??;

    info!(
        source = ?resolution.source,
        answer_len = resolution.answer.len(),
        "chat answered"
    );
    Ok(Json(ChatResponse {
        response: resolution.answer,
    }))
}
