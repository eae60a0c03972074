use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use litmeta_core::search::{checked_retmax, crossref_by_title, pubmed_search};
use serde::Deserialize;
use serde_json::json;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PubmedParams {
    #[serde(default)]
    pub query: String,
    pub retmax: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CrossrefParams {
    #[serde(default)]
    pub title: String,
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

/// `GET /pubmed/search?query=&retmax=`
pub async fn pubmed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PubmedParams>,
) -> Response {
    let retmax = match params.retmax.as_deref().map(str::trim) {
        None | Some("") => checked_retmax(None),
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| format!("retmax must be an integer, got {raw:?}"))
            .and_then(|n| checked_retmax(Some(n))),
    };
    let retmax = match retmax {
        Ok(n) => n,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    match pubmed_search(&state.config, &state.client, &params.query, retmax).await {
        Ok(results) => Json(json!({ "results": results })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "pubmed search failed");
            error_response(StatusCode::BAD_GATEWAY, e)
        }
    }
}

/// `GET /crossref/by-title?title=`
pub async fn crossref(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CrossrefParams>,
) -> Response {
    match crossref_by_title(&state.config, &state.client, &params.title).await {
        Ok(Some(summary)) => Json(summary).into_response(),
        Ok(None) => Json(json!({})).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "crossref lookup failed");
            error_response(StatusCode::BAD_GATEWAY, e)
        }
    }
}
