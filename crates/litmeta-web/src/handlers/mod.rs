pub mod health;
pub mod quotes;
pub mod search;
pub mod verify;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use litmeta_core::{ErrorCode, ErrorReport};

/// A body that failed to decode as the expected JSON shape, or that ran past
/// the body limit.
pub(crate) fn malformed(rejection: JsonRejection) -> ErrorReport {
    tracing::debug!(error = %rejection, "rejected request body");
    let code = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorCode::DocumentTooLarge
    } else {
        ErrorCode::MalformedRequest
    };
    ErrorReport::new(code, rejection.body_text())
}
