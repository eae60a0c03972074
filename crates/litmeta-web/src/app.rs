use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::state::AppState;

/// Headroom for JSON framing around a base64 document.
const BODY_SLACK_BYTES: usize = 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    // Base64 inflates a document by 4/3.
    let body_limit = state.config.max_document_bytes / 3 * 4 + BODY_SLACK_BYTES;

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/pubmed/search", get(handlers::search::pubmed))
        .route("/crossref/by-title", get(handlers::search::crossref))
        .route("/verify/citation", post(handlers::verify::verify_citation))
        .route("/validate/quotes", post(handlers::quotes::validate_quotes))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
