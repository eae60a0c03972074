//! Quote Validator: checks that claimed quotations appear on their claimed pages.
//!
//! Page text and quote are both whitespace-normalized, then compared with a
//! case-sensitive substring search. Hyphenation, ligatures and OCR noise are
//! not compensated for.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backend::PdfBackend;
use crate::fetch::{DocumentFetcher, FetchError};
use crate::lenient;
use crate::matching::normalize_whitespace;
use crate::report::{ErrorCode, ErrorReport, OkTag};
use crate::Config;

/// One paragraph's claim that `source_quote` appears on `source_page` (1-based).
///
/// `source_page` is decoded leniently, so a numeric string such as `"3"` is
/// echoed back in a mismatch as the number `3`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteClaim {
    #[serde(default)]
    pub source_quote: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub source_page: i64,
    /// Any other caller fields, echoed back in mismatches.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QuoteClaim {
    pub fn new(source_quote: impl Into<String>, source_page: i64) -> Self {
        Self {
            source_quote: source_quote.into(),
            source_page,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchReason {
    InvalidPageOrEmptyQuote,
    QuoteNotFoundOnPage,
}

impl MismatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MismatchReason::InvalidPageOrEmptyQuote => "invalid_page_or_empty_quote",
            MismatchReason::QuoteNotFoundOnPage => "quote_not_found_on_page",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    #[serde(flatten)]
    pub claim: QuoteClaim,
    pub reason: MismatchReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteReport {
    pub status: OkTag,
    pub checked: usize,
    pub matched: usize,
    pub mismatches: Vec<Mismatch>,
    /// Page count of an extracted document; absent when page texts were supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_available: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuoteResponse {
    Report(QuoteReport),
    Error(ErrorReport),
}

impl QuoteResponse {
    pub fn status(&self) -> &'static str {
        match self {
            QuoteResponse::Report(_) => "ok",
            QuoteResponse::Error(_) => "error",
        }
    }
}

impl From<ErrorReport> for QuoteResponse {
    fn from(report: ErrorReport) -> Self {
        QuoteResponse::Error(report)
    }
}

/// Wire request: one of three document forms plus the claims to check.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub page_texts: Option<Vec<String>>,
    #[serde(default)]
    pub pdf_base64: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default, alias = "claims", deserialize_with = "lenient::list")]
    pub paragraphs: Vec<QuoteClaim>,
}

/// Where the page texts come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    PageTexts(Vec<String>),
    Bytes(Vec<u8>),
    Url(String),
}

/// Check each claim against `pages` (index 0 is page 1).
pub fn check_claims(pages: &[String], claims: &[QuoteClaim]) -> QuoteReport {
    let normalized: Vec<OnceCell<String>> = pages.iter().map(|_| OnceCell::new()).collect();
    let mut matched = 0;
    let mut mismatches = Vec::new();

    for claim in claims {
        let quote = normalize_whitespace(&claim.source_quote);
        let index = usize::try_from(claim.source_page)
            .ok()
            .filter(|&page| page >= 1 && page <= pages.len())
            .map(|page| page - 1);

        let reason = match index {
            Some(i) if !quote.is_empty() => {
                let page = normalized[i].get_or_init(|| normalize_whitespace(&pages[i]));
                if page.contains(quote.as_str()) {
                    None
                } else {
                    Some(MismatchReason::QuoteNotFoundOnPage)
                }
            }
            _ => Some(MismatchReason::InvalidPageOrEmptyQuote),
        };

        match reason {
            None => matched += 1,
            Some(reason) => {
                // The verdict owns the `reason` key.
                let mut claim = claim.clone();
                claim.extra.remove("reason");
                mismatches.push(Mismatch { claim, reason });
            }
        }
    }

    QuoteReport {
        status: OkTag::Ok,
        checked: claims.len(),
        matched,
        mismatches,
        pages_available: None,
    }
}

/// Strip an optional `data:...;base64,` prefix and embedded whitespace.
fn clean_base64(encoded: &str) -> String {
    let body = match encoded.find(";base64,") {
        Some(pos) if encoded.trim_start().starts_with("data:") => &encoded[pos + 8..],
        _ => encoded,
    };
    body.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

/// Resolves a document into page texts and checks claims against it.
pub struct QuoteValidator {
    max_claims: usize,
    max_document_bytes: usize,
    pdf: Option<Arc<dyn PdfBackend>>,
    fetcher: Arc<dyn DocumentFetcher>,
}

impl QuoteValidator {
    /// `pdf` is the extraction capability resolved at start-up; without it
    /// only the page-text input form is served.
    pub fn new(
        config: &Config,
        pdf: Option<Arc<dyn PdfBackend>>,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Self {
        Self {
            max_claims: config.max_quote_claims,
            max_document_bytes: config.max_document_bytes,
            pdf,
            fetcher,
        }
    }

    pub fn can_extract_pdf(&self) -> bool {
        self.pdf.is_some()
    }

    /// Validate a wire request. Input forms are tried in priority order:
    /// page texts, then base64 bytes, then a remote URL.
    pub async fn validate(&self, request: QuoteRequest) -> QuoteResponse {
        let QuoteRequest {
            page_texts,
            pdf_base64,
            pdf_url,
            paragraphs,
        } = request;

        if let Err(report) = self.check_claim_count(&paragraphs) {
            return report.into();
        }

        let source = if let Some(pages) = page_texts.filter(|p| !p.is_empty()) {
            DocumentSource::PageTexts(pages)
        } else if let Some(encoded) = pdf_base64.filter(|s| !s.trim().is_empty()) {
            match self.backend().and_then(|_| self.decode_base64(&encoded)) {
                Ok(bytes) => DocumentSource::Bytes(bytes),
                Err(report) => return report.into(),
            }
        } else if let Some(url) = pdf_url.filter(|s| !s.trim().is_empty()) {
            DocumentSource::Url(url.trim().to_string())
        } else {
            return ErrorReport::new(
                ErrorCode::NoInputProvided,
                "provide page_texts, pdf_base64 or pdf_url",
            )
            .into();
        };

        self.validate_source(source, &paragraphs).await
    }

    /// Validate claims against an already-decoded document source.
    pub async fn validate_source(
        &self,
        source: DocumentSource,
        claims: &[QuoteClaim],
    ) -> QuoteResponse {
        if let Err(report) = self.check_claim_count(claims) {
            return report.into();
        }

        let (pages, extracted) = match source {
            DocumentSource::PageTexts(pages) => (pages, false),
            DocumentSource::Bytes(bytes) => match self.extract(bytes).await {
                Ok(pages) => (pages, true),
                Err(report) => return report.into(),
            },
            DocumentSource::Url(url) => match self.fetch_and_extract(&url).await {
                Ok(pages) => (pages, true),
                Err(report) => return report.into(),
            },
        };

        let mut report = check_claims(&pages, claims);
        if extracted {
            report.pages_available = Some(pages.len());
        }
        tracing::info!(
            checked = report.checked,
            matched = report.matched,
            pages = pages.len(),
            "quotes validated"
        );
        QuoteResponse::Report(report)
    }

    fn check_claim_count(&self, claims: &[QuoteClaim]) -> Result<(), ErrorReport> {
        if claims.is_empty() {
            return Err(ErrorReport::new(
                ErrorCode::NoParagraphs,
                "paragraphs must be a non-empty list of {source_quote, source_page}",
            ));
        }
        if claims.len() > self.max_claims {
            return Err(ErrorReport::new(
                ErrorCode::TooManyParagraphs,
                format!(
                    "{} paragraphs submitted; at most {} per call, split the request into batches",
                    claims.len(),
                    self.max_claims
                ),
            ));
        }
        Ok(())
    }

    fn too_large(&self, size: usize) -> ErrorReport {
        ErrorReport::new(
            ErrorCode::DocumentTooLarge,
            format!(
                "document is {} bytes; the limit is {} bytes",
                size, self.max_document_bytes
            ),
        )
    }

    fn decode_base64(&self, encoded: &str) -> Result<Vec<u8>, ErrorReport> {
        let cleaned = clean_base64(encoded);
        let estimated = cleaned.len() / 4 * 3;
        if estimated > self.max_document_bytes + 3 {
            return Err(self.too_large(estimated));
        }
        STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| ErrorReport::new(ErrorCode::InvalidBase64, format!("pdf_base64: {e}")))
    }

    fn backend(&self) -> Result<Arc<dyn PdfBackend>, ErrorReport> {
        self.pdf.clone().ok_or_else(|| {
            ErrorReport::new(
                ErrorCode::PdfExtractionUnavailable,
                "PDF text extraction is not available on this server; send page_texts instead",
            )
        })
    }

    async fn extract(&self, bytes: Vec<u8>) -> Result<Vec<String>, ErrorReport> {
        let backend = self.backend()?;
        if bytes.len() > self.max_document_bytes {
            return Err(self.too_large(bytes.len()));
        }

        match tokio::task::spawn_blocking(move || backend.extract_pages(&bytes)).await {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "PDF extraction failed");
                Err(ErrorReport::new(ErrorCode::PdfExtractionFailed, e.to_string()))
            }
            Err(e) => Err(ErrorReport::internal("extraction task", e)),
        }
    }

    async fn fetch_and_extract(&self, raw_url: &str) -> Result<Vec<String>, ErrorReport> {
        let url = reqwest::Url::parse(raw_url).map_err(|e| {
            ErrorReport::new(ErrorCode::InvalidUrl, format!("pdf_url {raw_url:?}: {e}"))
        })?;
        if url.scheme() != "https" {
            return Err(ErrorReport::new(
                ErrorCode::InsecureUrl,
                format!("pdf_url must use https, got {}", url.scheme()),
            ));
        }
        self.backend()?;

        let document = match self.fetcher.fetch(&url, self.max_document_bytes).await {
            Ok(doc) => doc,
            Err(FetchError::TooLarge { limit }) => {
                return Err(ErrorReport::new(
                    ErrorCode::DocumentTooLarge,
                    format!("document at pdf_url exceeds the limit of {limit} bytes"),
                ));
            }
            Err(FetchError::InsecureScheme) => {
                return Err(ErrorReport::new(
                    ErrorCode::InsecureUrl,
                    "pdf_url must use https",
                ));
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "document fetch failed");
                return Err(ErrorReport::new(
                    ErrorCode::DocumentFetchFailed,
                    e.to_string(),
                ));
            }
        };

        let is_pdf = document
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/pdf"));
        if !is_pdf {
            return Err(ErrorReport::new(
                ErrorCode::UnsupportedContentType,
                format!(
                    "expected application/pdf, got {}",
                    document.content_type.as_deref().unwrap_or("no content type")
                ),
            ));
        }

        self.extract(document.bytes).await
    }
}
