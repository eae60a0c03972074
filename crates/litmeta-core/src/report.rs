//! Structured error object shared by both engines.
//!
//! Input errors and internal faults are returned inline as
//! `{"status": "error", "code": ..., "message": ...}`; transports never map
//! them to failure status codes.

use serde::Serialize;

/// Constant `"ok"` tag for successful response bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OkTag {
    #[default]
    Ok,
}

/// Constant `"error"` tag for error response bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorTag {
    #[default]
    Error,
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MissingTitle,
    InvalidYear,
    InvalidDoi,
    MalformedRequest,
    NoParagraphs,
    TooManyParagraphs,
    InvalidBase64,
    DocumentTooLarge,
    InvalidUrl,
    InsecureUrl,
    UnsupportedContentType,
    DocumentFetchFailed,
    PdfExtractionUnavailable,
    PdfExtractionFailed,
    NoInputProvided,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingTitle => "missing_title",
            ErrorCode::InvalidYear => "invalid_year",
            ErrorCode::InvalidDoi => "invalid_doi",
            ErrorCode::MalformedRequest => "malformed_request",
            ErrorCode::NoParagraphs => "no_paragraphs",
            ErrorCode::TooManyParagraphs => "too_many_paragraphs",
            ErrorCode::InvalidBase64 => "invalid_base64",
            ErrorCode::DocumentTooLarge => "document_too_large",
            ErrorCode::InvalidUrl => "invalid_url",
            ErrorCode::InsecureUrl => "insecure_url",
            ErrorCode::UnsupportedContentType => "unsupported_content_type",
            ErrorCode::DocumentFetchFailed => "document_fetch_failed",
            ErrorCode::PdfExtractionUnavailable => "pdf_extraction_unavailable",
            ErrorCode::PdfExtractionFailed => "pdf_extraction_failed",
            ErrorCode::NoInputProvided => "no_input_provided",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub status: ErrorTag,
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorReport {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: ErrorTag::Error,
            code,
            message: message.into(),
        }
    }

    /// Report for an unexpected fault, carrying its category and message.
    pub fn internal(category: &str, message: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, format!("{category}: {message}"))
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_error_status() {
        let report = ErrorReport::new(ErrorCode::TooManyParagraphs, "at most 100");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "too_many_paragraphs");
        assert_eq!(json["message"], "at most 100");
    }

    #[test]
    fn as_str_agrees_with_serde() {
        for code in [
            ErrorCode::MissingTitle,
            ErrorCode::PdfExtractionUnavailable,
            ErrorCode::NoInputProvided,
            ErrorCode::InternalError,
        ] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, code.as_str());
        }
    }
}
