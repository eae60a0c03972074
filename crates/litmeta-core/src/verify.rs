//! Citation Matcher: cross-checks a claimed citation against external registries.
//!
//! Every applicable source is queried concurrently. A source whose record
//! has a title similarity of at least [`SIMILARITY_THRESHOLD`] and a year
//! within [`YEAR_TOLERANCE`] of the claim votes `true`; any other record
//! votes `false`. Sources that fail or return nothing cast no vote. The
//! claim is verified as soon as one vote is `true`.
//!
//! [`YEAR_TOLERANCE`]: crate::matching::YEAR_TOLERANCE

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::doi::{is_valid_doi, normalize_doi};
use crate::matching::{SIMILARITY_THRESHOLD, title_similarity, year_within_tolerance};
use crate::report::{ErrorCode, ErrorReport};
use crate::sources::crossref::CrossRef;
use crate::sources::doi_resolver::DoiResolver;
use crate::sources::pubmed::PubMed;
use crate::sources::{Candidate, CitationSource, Identifier, SourceKind};
use crate::{Config, lenient};

/// A citation asserted by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationClaim {
    #[serde(default)]
    pub title: String,
    /// Claimed publication year, 0 if unknown.
    #[serde(default, deserialize_with = "lenient::int32")]
    pub year: i32,
    #[serde(default, alias = "author", skip_serializing_if = "Option::is_none")]
    pub first_author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

impl CitationClaim {
    pub fn new(title: impl Into<String>, year: i32) -> Self {
        Self {
            title: title.into(),
            year,
            ..Self::default()
        }
    }

    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    /// Check the claim and return its normalized form (trimmed title, bare DOI).
    pub fn validated(&self) -> Result<CitationClaim, ErrorReport> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ErrorReport::new(
                ErrorCode::MissingTitle,
                "a non-empty title is required",
            ));
        }
        if self.year < 0 {
            return Err(ErrorReport::new(
                ErrorCode::InvalidYear,
                format!("year must be 0 (unknown) or positive, got {}", self.year),
            ));
        }
        let doi = self.doi.as_deref().and_then(normalize_doi);
        if let Some(ref doi) = doi {
            if !is_valid_doi(doi) {
                return Err(ErrorReport::new(
                    ErrorCode::InvalidDoi,
                    format!("DOI must look like 10.NNNN/suffix, got {:?}", doi),
                ));
            }
        }

        let trimmed = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Ok(CitationClaim {
            title: title.to_string(),
            year: self.year,
            first_author: trimmed(&self.first_author),
            journal: trimmed(&self.journal),
            doi,
        })
    }
}

/// A registry record scored against the claim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRecord {
    pub via: SourceKind,
    pub title: String,
    pub journal: String,
    pub year: i32,
    #[serde(flatten)]
    pub identifier: Identifier,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_author: Option<String>,
    pub similarity: f64,
}

impl SourceRecord {
    pub fn score(via: SourceKind, claim: &CitationClaim, candidate: Candidate) -> Self {
        let similarity = title_similarity(&claim.title, &candidate.title);
        Self {
            via,
            title: candidate.title,
            journal: candidate.journal,
            year: candidate.year,
            identifier: candidate.identifier,
            url: candidate.url,
            first_author: candidate.first_author,
            similarity,
        }
    }

    /// Whether this record corroborates a claim made for `claimed_year`.
    pub fn corroborates(&self, claimed_year: i32) -> bool {
        self.similarity >= SIMILARITY_THRESHOLD && year_within_tolerance(claimed_year, self.year)
    }
}

/// What one source contributed to a verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Record(SourceRecord),
    NotFound { via: SourceKind, found: bool },
    Failed { via: SourceKind, error: String },
}

impl SourceEntry {
    pub fn not_found(via: SourceKind) -> Self {
        SourceEntry::NotFound { via, found: false }
    }

    pub fn failed(via: SourceKind, error: impl Into<String>) -> Self {
        SourceEntry::Failed {
            via,
            error: error.into(),
        }
    }

    pub fn via(&self) -> SourceKind {
        match self {
            SourceEntry::Record(r) => r.via,
            SourceEntry::NotFound { via, .. } | SourceEntry::Failed { via, .. } => *via,
        }
    }

    pub fn record(&self) -> Option<&SourceRecord> {
        match self {
            SourceEntry::Record(r) => Some(r),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Vote {
    pub source: SourceKind,
    pub matched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    Mismatch,
    Unverified,
}

impl VerificationStatus {
    /// One `true` vote verifies; votes that are all `false` are a mismatch;
    /// no votes at all leave the claim unverified.
    pub fn from_votes(votes: &[Vote]) -> Self {
        if votes.iter().any(|v| v.matched) {
            VerificationStatus::Verified
        } else if votes.is_empty() {
            VerificationStatus::Unverified
        } else {
            VerificationStatus::Mismatch
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::Mismatch => "mismatch",
            VerificationStatus::Unverified => "unverified",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationVerdict {
    pub status: VerificationStatus,
    pub votes: Vec<Vote>,
    pub sources: Vec<SourceEntry>,
    pub claim: CitationClaim,
}

impl VerificationVerdict {
    pub fn from_entries(claim: CitationClaim, sources: Vec<SourceEntry>) -> Self {
        let votes: Vec<Vote> = sources
            .iter()
            .filter_map(SourceEntry::record)
            .map(|r| Vote {
                source: r.via,
                matched: r.corroborates(claim.year),
            })
            .collect();
        Self {
            status: VerificationStatus::from_votes(&votes),
            votes,
            sources,
            claim,
        }
    }
}

/// Result of [`CitationVerifier::verify`]: a verdict or an input error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VerifyResponse {
    Verdict(VerificationVerdict),
    Error(ErrorReport),
}

impl VerifyResponse {
    /// The `status` field as it appears on the wire.
    pub fn status(&self) -> &'static str {
        match self {
            VerifyResponse::Verdict(v) => v.status.as_str(),
            VerifyResponse::Error(_) => "error",
        }
    }
}

/// Queries a fixed set of sources and folds their votes into a verdict.
pub struct CitationVerifier {
    sources: Vec<Arc<dyn CitationSource>>,
    client: reqwest::Client,
    timeout: Duration,
}

impl CitationVerifier {
    /// Crossref, PubMed and DOI.org, minus any disabled in `config`.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let mut sources: Vec<Arc<dyn CitationSource>> = Vec::new();
        if !config.is_source_disabled(SourceKind::Crossref) {
            sources.push(Arc::new(CrossRef {
                mailto: config.crossref_mailto.clone(),
            }));
        }
        if !config.is_source_disabled(SourceKind::Pubmed) {
            sources.push(Arc::new(PubMed {
                tool: config.ncbi_tool.clone(),
                email: config.ncbi_email.clone(),
            }));
        }
        if !config.is_source_disabled(SourceKind::DoiOrg) {
            sources.push(Arc::new(DoiResolver));
        }
        Self::with_sources(sources, client, config.http_timeout())
    }

    pub fn with_sources(
        sources: Vec<Arc<dyn CitationSource>>,
        client: reqwest::Client,
        timeout: Duration,
    ) -> Self {
        Self {
            sources,
            client,
            timeout,
        }
    }

    pub fn source_kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|s| s.via()).collect()
    }

    /// Verify a claim. Never fails: input problems come back as
    /// [`VerifyResponse::Error`], upstream problems as per-source error entries.
    pub async fn verify(&self, claim: &CitationClaim) -> VerifyResponse {
        let claim = match claim.validated() {
            Ok(claim) => claim,
            Err(report) => {
                tracing::debug!(code = %report.code, "rejected citation claim");
                return VerifyResponse::Error(report);
            }
        };

        let entries = self.query_sources(&claim).await;
        let verdict = VerificationVerdict::from_entries(claim, entries);
        tracing::info!(
            title = %verdict.claim.title,
            status = verdict.status.as_str(),
            votes = verdict.votes.len(),
            "citation verified"
        );
        VerifyResponse::Verdict(verdict)
    }

    /// Query every applicable source concurrently; entries keep source order.
    async fn query_sources(&self, claim: &CitationClaim) -> Vec<SourceEntry> {
        let claim = Arc::new(claim.clone());
        // Two requests per source at most (PubMed search + fetch).
        let deadline = self.timeout * 2;

        let mut handles = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            if source.requires_doi() && claim.doi.is_none() {
                continue;
            }
            let source = Arc::clone(source);
            let claim = Arc::clone(&claim);
            let client = self.client.clone();
            let timeout = self.timeout;
            let via = source.via();

            let handle = tokio::spawn(async move {
                let lookup = source.lookup(&claim, &client, timeout);
                match tokio::time::timeout(deadline, lookup).await {
                    Ok(Ok(Some(candidate))) => {
                        SourceEntry::Record(SourceRecord::score(via, &claim, candidate))
                    }
                    Ok(Ok(None)) => SourceEntry::not_found(via),
                    Ok(Err(e)) => SourceEntry::failed(via, e.to_string()),
                    Err(_) => SourceEntry::failed(
                        via,
                        format!("timed out after {:.1}s", deadline.as_secs_f64()),
                    ),
                }
            });
            handles.push((via, handle));
        }

        let mut entries = Vec::with_capacity(handles.len());
        for (via, handle) in handles {
            let entry = match handle.await {
                Ok(entry) => entry,
                Err(e) => SourceEntry::failed(via, format!("internal_error: {}", e)),
            };
            match entry {
                SourceEntry::Record(ref r) => {
                    tracing::debug!(source = %via, similarity = r.similarity, year = r.year, "source record")
                }
                SourceEntry::NotFound { .. } => tracing::debug!(source = %via, "no result"),
                SourceEntry::Failed { ref error, .. } => {
                    tracing::warn!(source = %via, error = %error, "source lookup failed")
                }
            }
            entries.push(entry);
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(via: SourceKind, title: &str, year: i32, claim: &CitationClaim) -> SourceRecord {
        SourceRecord::score(
            via,
            claim,
            Candidate {
                title: title.into(),
                journal: "Nature".into(),
                year,
                identifier: Identifier::Doi("10.1038/nature14539".into()),
                url: "https://doi.org/10.1038/nature14539".into(),
                first_author: None,
            },
        )
    }

    #[test]
    fn identical_title_and_year_votes_true() {
        let claim = CitationClaim::new("Deep Learning", 2015);
        let r = record(SourceKind::Crossref, "Deep learning", 2015, &claim);
        assert!((r.similarity - 1.0).abs() < 1e-9);
        assert!(r.corroborates(claim.year));
    }

    #[test]
    fn unknown_claimed_year_ignores_registry_year() {
        let claim = CitationClaim::new("Deep Learning", 0);
        let r = record(SourceKind::Crossref, "Deep Learning", 1987, &claim);
        assert!(r.corroborates(claim.year));
    }

    #[test]
    fn year_off_by_two_votes_false() {
        let claim = CitationClaim::new("Deep Learning", 2015);
        assert!(record(SourceKind::Crossref, "Deep Learning", 2016, &claim).corroborates(2015));
        assert!(!record(SourceKind::Crossref, "Deep Learning", 2017, &claim).corroborates(2015));
    }

    #[test]
    fn extreme_years_vote_false_without_overflow() {
        let claim = CitationClaim::new("Deep Learning", i32::MAX);
        let r = record(SourceKind::Crossref, "Deep Learning", -1, &claim);
        let verdict = VerificationVerdict::from_entries(claim, vec![SourceEntry::Record(r)]);
        assert_eq!(verdict.status, VerificationStatus::Mismatch);
    }

    #[test]
    fn dissimilar_title_votes_false() {
        let claim = CitationClaim::new("Deep Learning", 2015);
        let r = record(SourceKind::Pubmed, "Protein folding in yeast", 2015, &claim);
        assert!(!r.corroborates(claim.year));
    }

    #[test]
    fn status_from_votes() {
        let t = |source| Vote {
            source,
            matched: true,
        };
        let f = |source| Vote {
            source,
            matched: false,
        };
        assert_eq!(
            VerificationStatus::from_votes(&[]),
            VerificationStatus::Unverified
        );
        assert_eq!(
            VerificationStatus::from_votes(&[f(SourceKind::Crossref), f(SourceKind::Pubmed)]),
            VerificationStatus::Mismatch
        );
        assert_eq!(
            VerificationStatus::from_votes(&[
                f(SourceKind::Crossref),
                t(SourceKind::Pubmed),
                f(SourceKind::DoiOrg)
            ]),
            VerificationStatus::Verified
        );
    }

    #[test]
    fn failed_and_empty_sources_cast_no_vote() {
        let claim = CitationClaim::new("Deep Learning", 2015);
        let verdict = VerificationVerdict::from_entries(
            claim,
            vec![
                SourceEntry::failed(SourceKind::Crossref, "HTTP 503"),
                SourceEntry::not_found(SourceKind::Pubmed),
            ],
        );
        assert!(verdict.votes.is_empty());
        assert_eq!(verdict.status, VerificationStatus::Unverified);
        assert_eq!(verdict.sources.len(), 2);
    }

    #[test]
    fn validation_rejects_bad_input() {
        let err = CitationClaim::new("   ", 2015).validated().unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingTitle);

        let err = CitationClaim::new("Deep Learning", -3).validated().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidYear);

        let err = CitationClaim::new("Deep Learning", 2015)
            .with_doi("nature14539")
            .validated()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDoi);
    }

    #[test]
    fn validation_normalizes() {
        let claim = CitationClaim {
            title: "  Deep Learning ".into(),
            year: 2015,
            first_author: Some("  ".into()),
            journal: Some(" Nature ".into()),
            doi: Some("https://doi.org/10.1038/nature14539".into()),
        };
        let v = claim.validated().unwrap();
        assert_eq!(v.title, "Deep Learning");
        assert_eq!(v.first_author, None);
        assert_eq!(v.journal.as_deref(), Some("Nature"));
        assert_eq!(v.doi.as_deref(), Some("10.1038/nature14539"));

        let blank_doi = CitationClaim::new("Deep Learning", 2015).with_doi("  ");
        assert_eq!(blank_doi.validated().unwrap().doi, None);
    }

    #[test]
    fn claim_deserializes_leniently() {
        let claim: CitationClaim = serde_json::from_value(json!({
            "title": "Deep Learning",
            "year": "2015",
            "author": "LeCun"
        }))
        .unwrap();
        assert_eq!(claim.year, 2015);
        assert_eq!(claim.first_author.as_deref(), Some("LeCun"));

        let claim: CitationClaim = serde_json::from_value(json!({"title": "x", "year": null})).unwrap();
        assert_eq!(claim.year, 0);
    }

    #[test]
    fn verdict_serializes_wire_shape() {
        let claim = CitationClaim::new("Deep Learning", 2015);
        let entries = vec![
            SourceEntry::Record(record(SourceKind::Crossref, "Deep learning", 2015, &claim)),
            SourceEntry::not_found(SourceKind::Pubmed),
            SourceEntry::failed(SourceKind::DoiOrg, "HTTP 500"),
        ];
        let verdict = VerificationVerdict::from_entries(claim, entries);
        let json = serde_json::to_value(VerifyResponse::Verdict(verdict)).unwrap();

        assert_eq!(json["status"], "verified");
        assert_eq!(json["votes"], json!([{"source": "crossref", "matched": true}]));
        assert_eq!(json["sources"][0]["via"], "crossref");
        assert_eq!(json["sources"][0]["doi"], "10.1038/nature14539");
        assert_eq!(json["sources"][1], json!({"via": "pubmed", "found": false}));
        assert_eq!(json["sources"][2], json!({"via": "doi.org", "error": "HTTP 500"}));
        assert_eq!(json["claim"]["title"], "Deep Learning");
    }

    #[test]
    fn error_response_status() {
        let resp = VerifyResponse::Error(ErrorReport::new(ErrorCode::MissingTitle, "x"));
        assert_eq!(resp.status(), "error");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], "missing_title");
    }
}
