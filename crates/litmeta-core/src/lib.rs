use std::time::Duration;
use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod doi;
pub mod fetch;
mod lenient;
pub mod matching;
pub mod quote;
pub mod report;
pub mod search;
pub mod sources;
pub mod verify;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend};
pub use fetch::{DocumentFetcher, FetchError, FetchedDocument, HttpFetcher};
pub use matching::{normalize_whitespace, title_similarity};
pub use quote::{
    DocumentSource, Mismatch, MismatchReason, QuoteClaim, QuoteReport, QuoteRequest,
    QuoteResponse, QuoteValidator, check_claims,
};
pub use report::{ErrorCode, ErrorReport};
pub use sources::{Candidate, CitationSource, Identifier, SourceError, SourceKind};
pub use verify::{
    CitationClaim, CitationVerifier, SourceEntry, SourceRecord, VerificationStatus,
    VerificationVerdict, VerifyResponse, Vote,
};

pub const APP_NAME: &str = "LitMeta";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default per-call timeout for upstream requests, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: f64 = 12.0;
/// Default cap on quote claims per validation call.
pub const DEFAULT_MAX_QUOTE_CLAIMS: usize = 100;
/// Default ceiling for a decoded or downloaded document (15 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 15 * 1024 * 1024;

const MIN_TIMEOUT_SECS: f64 = 1.0;
const MAX_TIMEOUT_SECS: f64 = 60.0;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Runtime configuration, built once at start-up and shared read-only.
#[derive(Clone)]
pub struct Config {
    /// Contact address sent to NCBI E-utilities (`email` parameter).
    pub ncbi_email: Option<String>,
    /// Tool name sent to NCBI E-utilities (`tool` parameter).
    pub ncbi_tool: String,
    /// Contact address embedded in the Crossref `User-Agent`.
    pub crossref_mailto: Option<String>,
    pub http_timeout_secs: f64,
    /// Sources excluded from citation verification (case-insensitive names).
    pub disabled_sources: Vec<String>,
    pub max_quote_claims: usize,
    pub max_document_bytes: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("ncbi_email", &self.ncbi_email.as_ref().map(|_| "***"))
            .field("ncbi_tool", &self.ncbi_tool)
            .field(
                "crossref_mailto",
                &self.crossref_mailto.as_ref().map(|_| "***"),
            )
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("disabled_sources", &self.disabled_sources)
            .field("max_quote_claims", &self.max_quote_claims)
            .field("max_document_bytes", &self.max_document_bytes)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ncbi_email: None,
            ncbi_tool: "litmeta".to_string(),
            crossref_mailto: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            disabled_sources: vec![],
            max_quote_claims: DEFAULT_MAX_QUOTE_CLAIMS,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl Config {
    /// The per-call upstream timeout, clamped into 1..=60 seconds.
    pub fn http_timeout(&self) -> Duration {
        let secs = if self.http_timeout_secs.is_finite() {
            self.http_timeout_secs
                .clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
        } else {
            DEFAULT_HTTP_TIMEOUT_SECS
        };
        Duration::from_secs_f64(secs)
    }

    /// Overlay `NCBI_EMAIL`, `CROSSREF_MAILTO` and `HTTP_TIMEOUT` from the environment.
    pub fn apply_env(&mut self) {
        if let Some(email) = non_empty_env("NCBI_EMAIL") {
            self.ncbi_email = Some(email);
        }
        if let Some(mailto) = non_empty_env("CROSSREF_MAILTO") {
            self.crossref_mailto = Some(mailto);
        }
        if let Some(secs) = non_empty_env("HTTP_TIMEOUT").and_then(|v| v.parse::<f64>().ok()) {
            self.http_timeout_secs = secs;
        }
    }

    pub fn is_source_disabled(&self, kind: SourceKind) -> bool {
        self.disabled_sources
            .iter()
            .any(|d| d.trim().eq_ignore_ascii_case(kind.as_str()))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Build the shared HTTP client used for every upstream call.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client, CoreError> {
    let client = reqwest::Client::builder()
        .user_agent(format!("litmeta/{VERSION}"))
        .connect_timeout(config.http_timeout())
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped() {
        let mut config = Config::default();
        assert_eq!(config.http_timeout(), Duration::from_secs(12));

        config.http_timeout_secs = 0.1;
        assert_eq!(config.http_timeout(), Duration::from_secs(1));

        config.http_timeout_secs = 600.0;
        assert_eq!(config.http_timeout(), Duration::from_secs(60));

        config.http_timeout_secs = f64::NAN;
        assert_eq!(config.http_timeout(), Duration::from_secs(12));
    }

    #[test]
    fn disabled_sources_match_case_insensitively() {
        let config = Config {
            disabled_sources: vec!["PubMed".into(), " DOI.org ".into()],
            ..Config::default()
        };
        assert!(config.is_source_disabled(SourceKind::Pubmed));
        assert!(config.is_source_disabled(SourceKind::DoiOrg));
        assert!(!config.is_source_disabled(SourceKind::Crossref));
    }

    #[test]
    fn debug_redacts_contact_addresses() {
        let config = Config {
            ncbi_email: Some("me@example.org".into()),
            crossref_mailto: Some("me@example.org".into()),
            ..Config::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("me@example.org"));
        assert!(rendered.contains("***"));
    }
}
