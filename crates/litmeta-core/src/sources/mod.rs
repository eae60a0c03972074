//! External bibliographic registries queried during citation verification.

pub mod crossref;
pub mod doi_resolver;
pub mod pubmed;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::verify::CitationClaim;

/// The registry a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "crossref")]
    Crossref,
    #[serde(rename = "pubmed")]
    Pubmed,
    #[serde(rename = "doi.org")]
    DoiOrg,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Crossref => "crossref",
            SourceKind::Pubmed => "pubmed",
            SourceKind::DoiOrg => "doi.org",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry identifier of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Identifier {
    Doi(String),
    Pmid(String),
}

/// Metadata a registry returned for a lookup, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub journal: String,
    /// Publication year, 0 if unknown.
    pub year: i32,
    pub identifier: Identifier,
    pub url: String,
    pub first_author: Option<String>,
}

/// Failure of a single upstream lookup.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limited (429)")]
    RateLimited,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Future returned by [`CitationSource::lookup`].
pub type LookupFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<Candidate>, SourceError>> + Send + 'a>>;

/// A registry that can be asked for the record best matching a claim.
pub trait CitationSource: Send + Sync {
    fn via(&self) -> SourceKind;

    /// Sources that can only resolve a DOI are skipped for claims without one.
    fn requires_doi(&self) -> bool {
        false
    }

    /// Look up the claim. `Ok(None)` means the registry answered with no result.
    fn lookup<'a>(
        &'a self,
        claim: &'a CitationClaim,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> LookupFuture<'a>;
}

/// Map non-success statuses to [`SourceError`].
pub(crate) fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if status.as_u16() == 429 {
        return Err(SourceError::RateLimited);
    }
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }
    Ok(resp)
}

/// Read a response body as JSON.
pub(crate) async fn read_json(resp: reqwest::Response) -> Result<Value, SourceError> {
    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| SourceError::Decode(e.to_string()))
}

/// A string field that registries send either bare or as a list; first entry wins.
pub(crate) fn first_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .first()
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// First element of the first `date-parts` tuple (`{"date-parts": [[2015, 5, 28]]}`), or 0.
pub(crate) fn first_date_part(value: &Value) -> i32 {
    let part = &value["date-parts"][0][0];
    part.as_i64()
        .or_else(|| part.as_str().and_then(|s| s.trim().parse().ok()))
        .and_then(|y| i32::try_from(y).ok())
        .unwrap_or(0)
}

/// Family name of the first author in a CSL/Crossref author list.
pub(crate) fn first_family_name(value: &Value) -> Option<String> {
    let first = value.as_array()?.first()?;
    first["family"]
        .as_str()
        .or_else(|| first["literal"].as_str())
        .or_else(|| first["name"].as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `"<family> <initials> et al."` for the first author of a CSL/Crossref author list.
pub(crate) fn authors_short(value: &Value) -> String {
    let Some(first) = value.as_array().and_then(|a| a.first()) else {
        return String::new();
    };
    let family = first["family"].as_str().unwrap_or("").trim();
    if family.is_empty() {
        return String::new();
    }
    let initials: String = first["given"]
        .as_str()
        .unwrap_or("")
        .split_whitespace()
        .filter_map(|part| part.chars().next())
        .collect();
    if initials.is_empty() {
        format!("{family} et al.")
    } else {
        format!("{family} {initials} et al.")
    }
}
