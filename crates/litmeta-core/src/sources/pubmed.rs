use super::{
    Candidate, CitationSource, Identifier, LookupFuture, SourceError, SourceKind, check_status,
    read_json,
};
use crate::verify::CitationClaim;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;
use std::time::Duration;

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

pub struct PubMed {
    pub tool: String,
    pub email: Option<String>,
}

/// One `<PubmedArticle>` from an efetch response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PubmedArticle {
    pub title: String,
    pub journal: String,
    pub year: i32,
    pub first_author_last: String,
    pub first_author_initials: String,
    pub doi: String,
    pub pmid: String,
}

impl PubmedArticle {
    pub fn authors_short(&self) -> String {
        if self.first_author_last.is_empty() {
            String::new()
        } else if self.first_author_initials.is_empty() {
            format!("{} et al.", self.first_author_last)
        } else {
            format!("{} {} et al.", self.first_author_last, self.first_author_initials)
        }
    }

    pub fn url(&self) -> String {
        if self.pmid.is_empty() {
            String::new()
        } else {
            format!("https://pubmed.ncbi.nlm.nih.gov/{}/", self.pmid)
        }
    }
}

/// Simplified metadata returned by `/pubmed/search`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleSummary {
    pub title: String,
    pub authors_short: String,
    pub year: i32,
    pub journal: String,
    pub doi_or_pmid: String,
    pub url: String,
}

impl From<&PubmedArticle> for ArticleSummary {
    fn from(a: &PubmedArticle) -> Self {
        Self {
            title: a.title.clone(),
            authors_short: a.authors_short(),
            year: a.year,
            journal: a.journal.clone(),
            doi_or_pmid: if a.doi.is_empty() {
                a.pmid.clone()
            } else {
                a.doi.clone()
            },
            url: a.url(),
        }
    }
}

/// Parse the leading four characters of a PubMed date field as a year.
///
/// `"2015"` and `"2015 Jan-Feb"` yield 2015; anything not purely digits yields 0.
pub fn parse_year_prefix(raw: &str) -> i32 {
    let prefix: String = raw.trim().chars().take(4).collect();
    if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
        prefix.parse().unwrap_or(0)
    } else {
        0
    }
}

/// Which article field the current text node belongs to.
#[derive(Clone, Copy, PartialEq)]
enum Field {
    Title,
    Journal,
    Year,
    MedlineDate,
    LastName,
    CollectiveName,
    Initials,
    ArticleId,
    MedlinePmid,
}

fn field_for(stack: &[String]) -> Option<Field> {
    let path = stack.join("/");
    if path.contains("MedlineCitation/Article/ArticleTitle") {
        // Titles may hold inline markup (<i>, <sup>); every descendant text counts.
        return Some(Field::Title);
    }
    let field = if path.ends_with("Article/Journal/Title") {
        Field::Journal
    } else if path.ends_with("JournalIssue/PubDate/Year") {
        Field::Year
    } else if path.ends_with("JournalIssue/PubDate/MedlineDate") {
        Field::MedlineDate
    } else if path.ends_with("AuthorList/Author/LastName") {
        Field::LastName
    } else if path.ends_with("AuthorList/Author/CollectiveName") {
        Field::CollectiveName
    } else if path.ends_with("AuthorList/Author/Initials") {
        Field::Initials
    } else if path.ends_with("PubmedData/ArticleIdList/ArticleId") {
        Field::ArticleId
    } else if path.ends_with("MedlineCitation/PMID") {
        Field::MedlinePmid
    } else {
        return None;
    };
    Some(field)
}

#[derive(Default)]
struct ArticleState {
    title: String,
    journal: String,
    year: String,
    medline_date: String,
    last_name: String,
    collective_name: String,
    initials: String,
    doi: String,
    pubmed_id: String,
    medline_pmid: String,
    authors_seen: usize,
    id_type: Option<String>,
}

impl ArticleState {
    fn push_text(&mut self, field: Field, text: &str) {
        let first_author = self.authors_seen == 1;
        match field {
            Field::Title => self.title.push_str(text),
            Field::Journal => self.journal.push_str(text),
            Field::Year => self.year.push_str(text),
            Field::MedlineDate => self.medline_date.push_str(text),
            Field::LastName if first_author => self.last_name.push_str(text),
            Field::CollectiveName if first_author => self.collective_name.push_str(text),
            Field::Initials if first_author => self.initials.push_str(text),
            Field::ArticleId => match self.id_type.as_deref() {
                Some("doi") => self.doi.push_str(text),
                Some("pubmed") => self.pubmed_id.push_str(text),
                _ => {}
            },
            Field::MedlinePmid => self.medline_pmid.push_str(text),
            _ => {}
        }
    }

    fn finish(self) -> PubmedArticle {
        let year_field = if self.year.trim().is_empty() {
            &self.medline_date
        } else {
            &self.year
        };
        let last = if self.last_name.trim().is_empty() {
            self.collective_name.trim()
        } else {
            self.last_name.trim()
        };
        let pmid = if self.pubmed_id.trim().is_empty() {
            self.medline_pmid.trim()
        } else {
            self.pubmed_id.trim()
        };
        PubmedArticle {
            title: self.title.trim().to_string(),
            journal: self.journal.trim().to_string(),
            year: parse_year_prefix(year_field),
            first_author_last: last.to_string(),
            first_author_initials: self.initials.trim().to_string(),
            doi: self.doi.trim().to_string(),
            pmid: pmid.to_string(),
        }
    }
}

/// Parse an efetch `PubmedArticleSet` XML document.
pub fn parse_efetch(xml: &str) -> Result<Vec<PubmedArticle>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<String> = Vec::new();
    let mut articles = Vec::new();
    let mut current: Option<ArticleState> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "PubmedArticle" => current = Some(ArticleState::default()),
                    "Author" if stack.last().is_some_and(|p| p == "AuthorList") => {
                        if let Some(ref mut article) = current {
                            article.authors_seen += 1;
                        }
                    }
                    "ArticleId" => {
                        if let Some(ref mut article) = current {
                            article.id_type = e
                                .attributes()
                                .flatten()
                                .find(|a| a.key.as_ref() == b"IdType")
                                .map(|a| String::from_utf8_lossy(&a.value).into_owned());
                        }
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(article), Some(field)) = (current.as_mut(), field_for(&stack)) {
                    let text = e
                        .unescape()
                        .map_err(|err| SourceError::Decode(err.to_string()))?;
                    article.push_text(field, &text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let (Some(article), Some(field)) = (current.as_mut(), field_for(&stack)) {
                    article.push_text(field, &String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(ref e)) => {
                stack.pop();
                if e.name().as_ref() == b"PubmedArticle" {
                    if let Some(article) = current.take() {
                        articles.push(article.finish());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Decode(e.to_string())),
            _ => {}
        }
    }

    Ok(articles)
}

impl PubMed {
    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string()), ("tool", self.tool.clone())];
        if let Some(ref email) = self.email {
            params.push(("email", email.clone()));
        }
        params
    }

    /// Run an esearch query and return the matching PMIDs.
    pub async fn search_ids(
        &self,
        term: &str,
        retmax: u32,
        client: &reqwest::Client,
        timeout: Duration,
    ) -> Result<Vec<String>, SourceError> {
        let mut params = self.base_params();
        params.push(("term", term.to_string()));
        params.push(("retmode", "json".to_string()));
        params.push(("retmax", retmax.to_string()));

        let resp = client
            .get(ESEARCH_URL)
            .query(&params)
            .timeout(timeout)
            .send()
            .await?;

        let data = read_json(check_status(resp)?).await?;
        let ids = data["esearchresult"]["idlist"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(ids)
    }

    /// Fetch full article records for the given PMIDs.
    pub async fn fetch_articles(
        &self,
        ids: &[String],
        client: &reqwest::Client,
        timeout: Duration,
    ) -> Result<Vec<PubmedArticle>, SourceError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut params = self.base_params();
        params.push(("id", ids.join(",")));
        params.push(("retmode", "xml".to_string()));

        let resp = client
            .get(EFETCH_URL)
            .query(&params)
            .timeout(timeout)
            .send()
            .await?;

        let body = check_status(resp)?.text().await?;
        parse_efetch(&body)
    }

    /// Free-form search returning simplified metadata for up to `retmax` articles.
    pub async fn search(
        &self,
        query: &str,
        retmax: u32,
        client: &reqwest::Client,
        timeout: Duration,
    ) -> Result<Vec<ArticleSummary>, SourceError> {
        let ids = self.search_ids(query, retmax, client, timeout).await?;
        let articles = self.fetch_articles(&ids, client, timeout).await?;
        Ok(articles.iter().map(ArticleSummary::from).collect())
    }
}

impl CitationSource for PubMed {
    fn via(&self) -> SourceKind {
        SourceKind::Pubmed
    }

    fn lookup<'a>(
        &'a self,
        claim: &'a CitationClaim,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> LookupFuture<'a> {
        Box::pin(async move {
            let term = format!("{}[ti]", claim.title.trim());
            let ids = self.search_ids(&term, 1, client, timeout).await?;
            let Some(pmid) = ids.into_iter().next() else {
                return Ok(None);
            };

            let articles = self
                .fetch_articles(std::slice::from_ref(&pmid), client, timeout)
                .await?;
            let Some(article) = articles.into_iter().next() else {
                return Ok(None);
            };

            let pmid = if article.pmid.is_empty() {
                pmid
            } else {
                article.pmid.clone()
            };
            Ok(Some(Candidate {
                url: format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid),
                title: article.title,
                journal: article.journal,
                year: article.year,
                identifier: Identifier::Pmid(pmid),
                first_author: Some(article.first_author_last).filter(|s| !s.is_empty()),
            }))
        })
    }
}
