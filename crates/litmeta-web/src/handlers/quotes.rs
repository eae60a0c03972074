use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use litmeta_core::{ErrorReport, QuoteRequest, QuoteResponse};

use super::malformed;
use crate::state::AppState;

/// `POST /validate/quotes`. Always answers 200; the report or error is in the body.
pub async fn validate_quotes(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Json<QuoteResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return Json(QuoteResponse::Error(malformed(rejection))),
    };

    let task = tokio::spawn(async move { state.validator.validate(request).await });
    let response = match task.await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "quote validation task failed");
            QuoteResponse::Error(ErrorReport::internal("quote validation task", e))
        }
    };
    Json(response)
}
