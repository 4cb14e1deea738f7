//! The single-page chat client.

use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const CHAT_JS: &str = include_str!("../../static/js/chat.js");

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/static/js/chat.js", get(chat_js))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn chat_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CHAT_JS,
    )
}
