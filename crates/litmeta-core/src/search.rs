//! Plain metadata lookups, sharing the registry clients used for verification.

use std::ops::RangeInclusive;

use crate::Config;
use crate::sources::SourceError;
use crate::sources::crossref::CrossRef;
use crate::sources::pubmed::PubMed;

pub use crate::sources::crossref::CrossrefSummary;
pub use crate::sources::pubmed::ArticleSummary;

/// Accepted `retmax` values for [`pubmed_search`].
pub const RETMAX_RANGE: RangeInclusive<u32> = 1..=50;
pub const DEFAULT_RETMAX: u32 = 10;

/// Check a caller-supplied `retmax`, falling back to the default when absent.
pub fn checked_retmax(retmax: Option<i64>) -> Result<u32, String> {
    let Some(n) = retmax else {
        return Ok(DEFAULT_RETMAX);
    };
    u32::try_from(n)
        .ok()
        .filter(|n| RETMAX_RANGE.contains(n))
        .ok_or_else(|| {
            format!(
                "retmax must be between {} and {}, got {}",
                RETMAX_RANGE.start(),
                RETMAX_RANGE.end(),
                n
            )
        })
}

/// PubMed search: esearch for IDs, then efetch for their records.
pub async fn pubmed_search(
    config: &Config,
    client: &reqwest::Client,
    query: &str,
    retmax: u32,
) -> Result<Vec<ArticleSummary>, SourceError> {
    let pubmed = PubMed {
        tool: config.ncbi_tool.clone(),
        email: config.ncbi_email.clone(),
    };
    let retmax = retmax.clamp(*RETMAX_RANGE.start(), *RETMAX_RANGE.end());
    let results = pubmed
        .search(query, retmax, client, config.http_timeout())
        .await?;
    tracing::debug!(query, retmax, hits = results.len(), "pubmed search");
    Ok(results)
}

/// Top Crossref work for a title, if the registry returned any.
pub async fn crossref_by_title(
    config: &Config,
    client: &reqwest::Client,
    title: &str,
) -> Result<Option<CrossrefSummary>, SourceError> {
    let crossref = CrossRef {
        mailto: config.crossref_mailto.clone(),
    };
    let summary = crossref
        .by_title(title, client, config.http_timeout())
        .await?;
    tracing::debug!(title, found = summary.is_some(), "crossref title lookup");
    Ok(summary)
}
