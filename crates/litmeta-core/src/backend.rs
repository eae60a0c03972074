use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
}

/// Trait for PDF text extraction backends.
///
/// Given the raw bytes of a document, an implementor returns one plain-text
/// string per page, in page order. Image-only pages yield empty strings.
/// Extraction is synchronous and CPU bound; callers run it off the async
/// executor.
pub trait PdfBackend: Send + Sync {
    fn extract_pages(&self, data: &[u8]) -> Result<Vec<String>, BackendError>;
}
