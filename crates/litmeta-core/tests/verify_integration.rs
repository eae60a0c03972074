//! Integration tests for [`CitationVerifier`] using mock sources.
//!
//! No HTTP requests are made: every source is a [`MockSource`] answering
//! from a canned response.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use litmeta_core::sources::LookupFuture;
use litmeta_core::{
    Candidate, CitationClaim, CitationSource, CitationVerifier, ErrorCode, Identifier,
    SourceEntry, SourceError, SourceKind, VerificationStatus, VerifyResponse,
};

#[derive(Clone, Debug)]
enum MockResponse {
    Found { title: String, year: i32 },
    NotFound,
    Error(u16),
    Panic,
}

struct MockSource {
    via: SourceKind,
    requires_doi: bool,
    response: MockResponse,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    fn new(via: SourceKind, response: MockResponse) -> Self {
        Self {
            via,
            requires_doi: false,
            response,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn found(via: SourceKind, title: &str, year: i32) -> Self {
        Self::new(
            via,
            MockResponse::Found {
                title: title.to_string(),
                year,
            },
        )
    }

    fn doi_only(mut self) -> Self {
        self.requires_doi = true;
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CitationSource for MockSource {
    fn via(&self) -> SourceKind {
        self.via
    }

    fn requires_doi(&self) -> bool {
        self.requires_doi
    }

    fn lookup<'a>(
        &'a self,
        _claim: &'a CitationClaim,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> LookupFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.response {
                MockResponse::Found { title, year } => Ok(Some(Candidate {
                    title: title.clone(),
                    journal: "Nature".into(),
                    year: *year,
                    identifier: Identifier::Doi("10.1038/nature14539".into()),
                    url: "https://doi.org/10.1038/nature14539".into(),
                    first_author: Some("LeCun".into()),
                })),
                MockResponse::NotFound => Ok(None),
                MockResponse::Error(code) => Err(SourceError::Status(*code)),
                MockResponse::Panic => panic!("mock source blew up"),
            }
        })
    }
}

fn verifier(sources: Vec<Arc<dyn CitationSource>>) -> CitationVerifier {
    CitationVerifier::with_sources(sources, reqwest::Client::new(), Duration::from_secs(2))
}

fn verdict(response: VerifyResponse) -> litmeta_core::VerificationVerdict {
    match response {
        VerifyResponse::Verdict(v) => v,
        VerifyResponse::Error(e) => panic!("expected a verdict, got {e}"),
    }
}

#[tokio::test]
async fn one_close_match_verifies() {
    let v = verifier(vec![
        Arc::new(MockSource::found(SourceKind::Crossref, "Deep learning", 2015)),
        Arc::new(MockSource::found(SourceKind::Pubmed, "Deep learning", 2016)),
    ]);
    let result = verdict(v.verify(&CitationClaim::new("Deep Learning", 2015)).await);

    assert_eq!(result.status, VerificationStatus::Verified);
    assert_eq!(result.votes.len(), 2);
    assert!(result.votes.iter().all(|vote| vote.matched));
}

#[tokio::test]
async fn distant_years_are_a_mismatch() {
    let v = verifier(vec![
        Arc::new(MockSource::found(SourceKind::Crossref, "Deep learning", 2010)),
        Arc::new(MockSource::found(SourceKind::Pubmed, "Something unrelated", 2015)),
    ]);
    let result = verdict(v.verify(&CitationClaim::new("Deep Learning", 2015)).await);

    assert_eq!(result.status, VerificationStatus::Mismatch);
    assert!(result.votes.iter().all(|vote| !vote.matched));
}

#[tokio::test]
async fn errors_and_empty_results_leave_claim_unverified() {
    let v = verifier(vec![
        Arc::new(MockSource::new(SourceKind::Crossref, MockResponse::Error(503))),
        Arc::new(MockSource::new(SourceKind::Pubmed, MockResponse::NotFound)),
    ]);
    let result = verdict(v.verify(&CitationClaim::new("Deep Learning", 2015)).await);

    assert_eq!(result.status, VerificationStatus::Unverified);
    assert!(result.votes.is_empty());
    assert_eq!(result.sources.len(), 2);
    assert!(matches!(
        &result.sources[0],
        SourceEntry::Failed { via: SourceKind::Crossref, error } if error.contains("503")
    ));
    assert_eq!(result.sources[1], SourceEntry::not_found(SourceKind::Pubmed));
}

#[tokio::test]
async fn one_failing_source_does_not_block_a_match() {
    let v = verifier(vec![
        Arc::new(MockSource::new(SourceKind::Crossref, MockResponse::Error(429))),
        Arc::new(MockSource::found(SourceKind::Pubmed, "Deep learning", 2015)),
    ]);
    let result = verdict(v.verify(&CitationClaim::new("Deep Learning", 2015)).await);

    assert_eq!(result.status, VerificationStatus::Verified);
    assert_eq!(result.votes.len(), 1);
    assert_eq!(result.votes[0].source, SourceKind::Pubmed);
}

#[tokio::test]
async fn panicking_source_becomes_error_entry() {
    let v = verifier(vec![
        Arc::new(MockSource::new(SourceKind::Crossref, MockResponse::Panic)),
        Arc::new(MockSource::found(SourceKind::Pubmed, "Deep learning", 2015)),
    ]);
    let result = verdict(v.verify(&CitationClaim::new("Deep Learning", 2015)).await);

    assert_eq!(result.status, VerificationStatus::Verified);
    match &result.sources[0] {
        SourceEntry::Failed { via, error } => {
            assert_eq!(*via, SourceKind::Crossref);
            assert!(error.starts_with("internal_error"), "got {error}");
        }
        other => panic!("expected an error entry, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn slow_source_times_out() {
    let slow = Arc::new(
        MockSource::found(SourceKind::Crossref, "Deep learning", 2015)
            .with_delay(Duration::from_secs(30)),
    );
    let v = verifier(vec![
        slow.clone(),
        Arc::new(MockSource::found(SourceKind::Pubmed, "Deep learning", 2015)),
    ]);
    let result = verdict(v.verify(&CitationClaim::new("Deep Learning", 2015)).await);

    assert_eq!(slow.call_count(), 1);
    assert!(matches!(
        &result.sources[0],
        SourceEntry::Failed { error, .. } if error.contains("timed out")
    ));
    assert_eq!(result.status, VerificationStatus::Verified);
}

#[tokio::test]
async fn doi_only_source_skipped_without_doi() {
    let resolver = Arc::new(
        MockSource::found(SourceKind::DoiOrg, "Deep learning", 2015).doi_only(),
    );
    let v = verifier(vec![
        Arc::new(MockSource::new(SourceKind::Crossref, MockResponse::NotFound)),
        resolver.clone(),
    ]);

    let result = verdict(v.verify(&CitationClaim::new("Deep Learning", 2015)).await);
    assert_eq!(resolver.call_count(), 0);
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.status, VerificationStatus::Unverified);

    let claim = CitationClaim::new("Deep Learning", 2015).with_doi("https://doi.org/10.1038/nature14539");
    let result = verdict(v.verify(&claim).await);
    assert_eq!(resolver.call_count(), 1);
    assert_eq!(result.sources.len(), 2);
    assert_eq!(result.sources[1].via(), SourceKind::DoiOrg);
    assert_eq!(result.status, VerificationStatus::Verified);
    assert_eq!(result.claim.doi.as_deref(), Some("10.1038/nature14539"));
}

#[tokio::test]
async fn entries_keep_source_order() {
    let v = verifier(vec![
        Arc::new(
            MockSource::found(SourceKind::Crossref, "Deep learning", 2015)
                .with_delay(Duration::from_millis(50)),
        ),
        Arc::new(MockSource::new(SourceKind::Pubmed, MockResponse::NotFound)),
    ]);
    let result = verdict(v.verify(&CitationClaim::new("Deep Learning", 2015)).await);
    let order: Vec<_> = result.sources.iter().map(SourceEntry::via).collect();
    assert_eq!(order, vec![SourceKind::Crossref, SourceKind::Pubmed]);
}

#[tokio::test]
async fn invalid_claims_are_rejected_before_lookup() {
    let source = Arc::new(MockSource::found(SourceKind::Crossref, "Deep learning", 2015));
    let v = verifier(vec![source.clone()]);

    for (claim, code) in [
        (CitationClaim::new("   ", 2015), ErrorCode::MissingTitle),
        (CitationClaim::new("Deep Learning", -1), ErrorCode::InvalidYear),
        (
            CitationClaim::new("Deep Learning", 2015).with_doi("not-a-doi"),
            ErrorCode::InvalidDoi,
        ),
    ] {
        match v.verify(&claim).await {
            VerifyResponse::Error(report) => assert_eq!(report.code, code),
            other => panic!("expected {code}, got {other:?}"),
        }
    }
    assert_eq!(source.call_count(), 0);
}

#[tokio::test]
async fn verdict_serializes_votes_and_sources() {
    let v = verifier(vec![
        Arc::new(MockSource::found(SourceKind::Crossref, "Deep learning", 2015)),
        Arc::new(MockSource::new(SourceKind::Pubmed, MockResponse::NotFound)),
    ]);
    let response = v.verify(&CitationClaim::new("Deep Learning", 2015)).await;
    assert_eq!(response.status(), "verified");

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "verified");
    assert_eq!(json["votes"][0]["source"], "crossref");
    assert_eq!(json["votes"][0]["matched"], true);
    assert_eq!(json["sources"][0]["via"], "crossref");
    assert_eq!(json["sources"][0]["doi"], "10.1038/nature14539");
    assert_eq!(json["sources"][1], serde_json::json!({"via": "pubmed", "found": false}));
    assert_eq!(json["claim"]["title"], "Deep Learning");
}
