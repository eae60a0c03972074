use super::{
    CitationSource, Candidate, Identifier, LookupFuture, SourceError, SourceKind, authors_short,
    check_status, first_date_part, first_family_name, first_string, read_json,
};
use crate::verify::CitationClaim;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const WORKS_URL: &str = "https://api.crossref.org/works";
const SELECT_FIELDS: &str = "DOI,title,container-title,author,issued,URL";

pub struct CrossRef {
    pub mailto: Option<String>,
}

/// The fields of a Crossref work this crate reads, decoded defensively.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossrefWork {
    pub doi: String,
    pub title: String,
    pub journal: String,
    pub year: i32,
    pub first_author: Option<String>,
    pub authors_short: String,
    pub url: String,
}

impl CrossrefWork {
    fn from_value(item: &Value) -> Self {
        Self {
            doi: item["DOI"].as_str().unwrap_or("").trim().to_string(),
            title: first_string(&item["title"]),
            journal: first_string(&item["container-title"]),
            year: first_date_part(&item["issued"]),
            first_author: first_family_name(&item["author"]),
            authors_short: authors_short(&item["author"]),
            url: item["URL"].as_str().unwrap_or("").trim().to_string(),
        }
    }
}

/// Summary returned by the `/crossref/by-title` lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossrefSummary {
    pub doi: String,
    pub journal: String,
    pub year: i32,
    pub authors_short: String,
    pub url: String,
}

impl From<CrossrefWork> for CrossrefSummary {
    fn from(work: CrossrefWork) -> Self {
        Self {
            doi: work.doi,
            journal: work.journal,
            year: work.year,
            authors_short: work.authors_short,
            url: work.url,
        }
    }
}

/// Decode the items of a `/works` response body.
pub fn parse_works(data: &Value) -> Vec<CrossrefWork> {
    data["message"]["items"]
        .as_array()
        .map(|items| items.iter().map(CrossrefWork::from_value).collect())
        .unwrap_or_default()
}

impl CrossRef {
    fn user_agent(&self) -> String {
        match self.mailto {
            Some(ref email) => format!("litmeta/1.0 (mailto:{})", email),
            None => "litmeta/1.0".to_string(),
        }
    }

    /// Query works by title and return the top-ranked result, if any.
    pub async fn top_work(
        &self,
        title: &str,
        client: &reqwest::Client,
        timeout: Duration,
    ) -> Result<Option<CrossrefWork>, SourceError> {
        let resp = client
            .get(WORKS_URL)
            .query(&[
                ("query.title", title),
                ("rows", "1"),
                ("select", SELECT_FIELDS),
            ])
            .header("User-Agent", self.user_agent())
            .timeout(timeout)
            .send()
            .await?;

        let data = read_json(check_status(resp)?).await?;
        Ok(parse_works(&data).into_iter().next())
    }

    pub async fn by_title(
        &self,
        title: &str,
        client: &reqwest::Client,
        timeout: Duration,
    ) -> Result<Option<CrossrefSummary>, SourceError> {
        Ok(self
            .top_work(title, client, timeout)
            .await?
            .map(CrossrefSummary::from))
    }
}

impl CitationSource for CrossRef {
    fn via(&self) -> SourceKind {
        SourceKind::Crossref
    }

    fn lookup<'a>(
        &'a self,
        claim: &'a CitationClaim,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> LookupFuture<'a> {
        Box::pin(async move {
            let Some(work) = self.top_work(claim.title.trim(), client, timeout).await? else {
                return Ok(None);
            };
            Ok(Some(Candidate {
                title: work.title,
                journal: work.journal,
                year: work.year,
                identifier: Identifier::Doi(work.doi),
                url: work.url,
                first_author: work.first_author,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_top_item() {
        let data = json!({
            "status": "ok",
            "message": {
                "items": [{
                    "DOI": "10.1038/nature14539",
                    "title": ["Deep learning"],
                    "container-title": ["Nature"],
                    "author": [{"given": "Yann", "family": "LeCun"}],
                    "issued": {"date-parts": [[2015, 5, 27]]},
                    "URL": "http://dx.doi.org/10.1038/nature14539"
                }]
            }
        });
        let works = parse_works(&data);
        assert_eq!(works.len(), 1);
        let work = &works[0];
        assert_eq!(work.doi, "10.1038/nature14539");
        assert_eq!(work.title, "Deep learning");
        assert_eq!(work.journal, "Nature");
        assert_eq!(work.year, 2015);
        assert_eq!(work.first_author.as_deref(), Some("LeCun"));
        assert_eq!(work.authors_short, "LeCun Y et al.");
        assert_eq!(work.url, "http://dx.doi.org/10.1038/nature14539");
    }

    #[test]
    fn missing_fields_default() {
        let data = json!({"message": {"items": [{"title": null, "issued": {}}]}});
        let work = &parse_works(&data)[0];
        assert_eq!(work.title, "");
        assert_eq!(work.journal, "");
        assert_eq!(work.year, 0);
        assert_eq!(work.doi, "");
        assert!(work.first_author.is_none());
    }

    #[test]
    fn no_items_is_empty() {
        assert!(parse_works(&json!({"message": {"items": []}})).is_empty());
        assert!(parse_works(&json!({"status": "failed"})).is_empty());
    }

    #[test]
    fn summary_serializes_original_shape() {
        let summary = CrossrefSummary {
            doi: "10.1/x".into(),
            journal: "J".into(),
            year: 2020,
            authors_short: "Doe J et al.".into(),
            url: "https://doi.org/10.1/x".into(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["doi"], "10.1/x");
        assert_eq!(json["authors_short"], "Doe J et al.");
        assert_eq!(json["year"], 2020);
    }
}
