//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON `{"error": ...}` body with an appropriate status code.
//!
//! Generation failures expose the backend's message to the caller; anything
//! else internal is logged in full and answered with a generic message.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nova_core::ResolveError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// All errors that can occur in the nova-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the server's size limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// The language model failed to produce an answer.
    #[error("generation error: {0}")]
    Generation(String),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ServerError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m),
            ServerError::Generation(m) => {
                error!(error = %m, "generation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<ResolveError> for ServerError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::EmptyQuestion => ServerError::BadRequest(e.to_string()),
            ResolveError::Generation(e) => ServerError::Generation(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = %rejection.status(), error = %rejection.body_text(), "rejected request body");
        ServerError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http_body_util::BodyExt;
    use nova_core::GenerationError;

    async fn render(err: ServerError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn empty_question_maps_to_400() {
        let (status, body) = render(ResolveError::EmptyQuestion.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No question provided");
    }

    #[tokio::test]
    async fn generation_error_exposes_message() {
        let err: ServerError =
            ResolveError::Generation(GenerationError::Inference("CUDA out of memory".into())).into();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("CUDA out of memory"));
    }

    #[tokio::test]
    async fn oversized_body_maps_to_413() {
        let (status, body) = render(ServerError::PayloadTooLarge("length limit exceeded".into())).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "length limit exceeded");
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let (status, body) = render(ServerError::Internal("/secret/path".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }
}
