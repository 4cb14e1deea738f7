//! Request / response bodies of `POST /chat`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The employee's question. Missing, `null` and `""` are all rejected.
    #[serde(default)]
    pub question: Option<String>,
}

/// Successful response body for `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// Canned or generated answer.
    pub response: String,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
