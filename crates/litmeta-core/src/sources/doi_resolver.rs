//! DOI resolver: looks up a claimed DOI at doi.org via content negotiation.

use std::time::Duration;

use serde_json::Value;

use super::{
    Candidate, CitationSource, Identifier, LookupFuture, SourceError, SourceKind, check_status,
    first_date_part, first_family_name, first_string, read_json,
};
use crate::doi::normalize_doi;
use crate::verify::CitationClaim;

const CSL_JSON: &str = "application/vnd.citationstyles.csl+json";

/// A citation source that resolves DOIs via doi.org CSL-JSON metadata.
pub struct DoiResolver;

/// Narrow a CSL-JSON document into a [`Candidate`].
pub fn candidate_from_csl(doi: &str, data: &Value) -> Candidate {
    let found_doi = data["DOI"]
        .as_str()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(doi)
        .to_string();
    let url = data["URL"]
        .as_str()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("https://doi.org/{}", doi));

    Candidate {
        title: first_string(&data["title"]),
        journal: first_string(&data["container-title"]),
        year: first_date_part(&data["issued"]),
        identifier: Identifier::Doi(found_doi),
        url,
        first_author: first_family_name(&data["author"]),
    }
}

impl CitationSource for DoiResolver {
    fn via(&self) -> SourceKind {
        SourceKind::DoiOrg
    }

    fn requires_doi(&self) -> bool {
        true
    }

    fn lookup<'a>(
        &'a self,
        claim: &'a CitationClaim,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> LookupFuture<'a> {
        Box::pin(async move {
            let Some(doi) = claim.doi.as_deref().and_then(normalize_doi) else {
                return Ok(None);
            };

            let resp = client
                .get(format!("https://doi.org/{}", doi))
                .header("Accept", CSL_JSON)
                .timeout(timeout)
                .send()
                .await?;

            // An unregistered DOI resolves to 404: the registry has no record.
            if resp.status().as_u16() == 404 {
                return Ok(None);
            }
            let data = read_json(check_status(resp)?).await?;
            if !data.is_object() {
                return Err(SourceError::Decode("expected a CSL-JSON object".into()));
            }
            Ok(Some(candidate_from_csl(&doi, &data)))
        })
    }
}
