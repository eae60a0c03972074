use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use litmeta_core::{CitationClaim, ErrorReport, VerifyResponse};

use super::malformed;
use crate::state::AppState;

/// `POST /verify/citation`. Always answers 200; the verdict or error is in the body.
pub async fn verify_citation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CitationClaim>, JsonRejection>,
) -> Json<VerifyResponse> {
    let claim = match payload {
        Ok(Json(claim)) => claim,
        Err(rejection) => return Json(VerifyResponse::Error(malformed(rejection))),
    };

    let task = tokio::spawn(async move { state.verifier.verify(&claim).await });
    let response = match task.await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "verification task failed");
            VerifyResponse::Error(ErrorReport::internal("verification task", e))
        }
    };
    Json(response)
}
