use crate::error::ServerError;
use axum::{
    body::{Body, Bytes, HttpBody},
    extract::Request,
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Request bodies are buffered here for logging, so they are capped before
/// any extractor sees them.
pub const MAX_REQUEST_BODY: usize = 2 * 1024 * 1024;

/// Bodies larger than this are summarised instead of logged.
const MAX_LOGGED_BODY: usize = 1024;

pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    // Reuse the caller's trace ID when it is a valid UUID.
    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let trace_header = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let mut response = match forward(req, next, trace_header.as_ref()).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        };
        if let Some(value) = trace_header {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );

        response
    }
    .instrument(span)
    .await
}

async fn forward(
    req: Request<Body>,
    next: Next,
    trace_header: Option<&HeaderValue>,
) -> Result<Response, ServerError> {
    let (parts, body) = req.into_parts();
    let limited = Limited::new(body, MAX_REQUEST_BODY);
    let req_bytes = buffer_and_log("request", &parts.headers, limited)
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                ServerError::PayloadTooLarge(format!(
                    "request body exceeds {MAX_REQUEST_BODY} bytes"
                ))
            } else {
                ServerError::BadRequest(format!("failed to read request body: {e}"))
            }
        })?;
    let mut req = Request::from_parts(parts, Body::from(req_bytes));
    if let Some(value) = trace_header {
        req.headers_mut().insert(X_TRACE_ID, value.clone());
    }

    let response = next.run(req).await;

    let (parts, body) = response.into_parts();
    let res_bytes = buffer_and_log("response", &parts.headers, body)
        .await
        .map_err(|e| ServerError::Internal(format!("failed to buffer response body: {e}")))?;
    Ok(Response::from_parts(parts, Body::from(res_bytes)))
}

/// Collect a body, logging it when it is small JSON.
async fn buffer_and_log<B>(direction: &str, headers: &header::HeaderMap, body: B) -> Result<Bytes, B::Error>
where
    B: HttpBody<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let is_json = content_type.contains("application/json");

    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read {} body", direction);
            return Err(e);
        }
    };

    if is_json && bytes.len() < MAX_LOGGED_BODY {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            info!("{} body: {}", direction, text);
        }
    } else if !bytes.is_empty() {
        info!(
            "{} body: [skipped: type={}, size={}]",
            direction,
            content_type,
            bytes.len()
        );
    }

    Ok(bytes)
}
