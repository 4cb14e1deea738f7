//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use nova_core::Resolver;

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Answer policy over the model loaded at startup.
    pub resolver: Arc<Resolver>,
}
