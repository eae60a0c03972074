use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use litmeta_core::{
    CitationClaim, CitationVerifier, Config, DocumentSource, HttpFetcher, PdfBackend, QuoteClaim,
    QuoteRequest, QuoteValidator, config_file, search,
};
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod output;

use output::ColorMode;

/// LitMeta - cross-check citations against Crossref, PubMed and DOI.org, and
/// validate quotations against their source document
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Print the raw JSON response instead of a summary
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Per-request upstream timeout in seconds (1-60)
    #[arg(long, global = true)]
    timeout: Option<f64>,

    /// Comma-separated list of sources to skip (crossref, pubmed, doi.org)
    #[arg(long, global = true, value_delimiter = ',')]
    disable_sources: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify a citation against the bibliographic registries
    Verify {
        /// Claimed title
        #[arg(long)]
        title: String,

        /// Claimed publication year (0 = unknown)
        #[arg(long, default_value_t = 0)]
        year: i32,

        /// Claimed first author
        #[arg(long)]
        author: Option<String>,

        /// Claimed journal
        #[arg(long)]
        journal: Option<String>,

        /// Claimed DOI (bare or as a doi.org URL)
        #[arg(long)]
        doi: Option<String>,
    },

    /// Check that quotations appear on their claimed pages
    Quotes {
        /// JSON file with the claims: a list of {source_quote, source_page}
        /// or a full request object
        claims: PathBuf,

        /// PDF file to extract page text from
        #[arg(long, conflicts_with_all = ["pages", "url"])]
        pdf: Option<PathBuf>,

        /// JSON file holding a list of page texts
        #[arg(long, conflicts_with = "url")]
        pages: Option<PathBuf>,

        /// https URL of the PDF
        #[arg(long)]
        url: Option<String>,
    },

    /// Search PubMed
    Pubmed {
        query: String,

        /// Number of results (1-50)
        #[arg(long, default_value_t = search::DEFAULT_RETMAX)]
        retmax: u32,
    },

    /// Look up the top Crossref work for a title
    Crossref { title: String },
}

/// Claims file contents: a bare claim list or a complete request.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClaimsFile {
    List(Vec<QuoteClaim>),
    Request(QuoteRequest),
}

fn pdf_backend() -> Option<Arc<dyn PdfBackend>> {
    #[cfg(feature = "pdf")]
    {
        Some(Arc::new(litmeta_pdf_mupdf::MupdfBackend::new()))
    }
    #[cfg(not(feature = "pdf"))]
    {
        None
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logs go to stderr so `--json` output stays clean.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();

    // Resolve configuration: CLI flags > env vars > config file > defaults
    let mut config = config_file::resolve();
    if let Some(secs) = cli.common.timeout {
        config.http_timeout_secs = secs;
    }
    config
        .disabled_sources
        .extend(cli.common.disable_sources.iter().cloned());
    tracing::debug!(?config, "configuration resolved");

    let client = litmeta_core::build_http_client(&config)?;
    let color = ColorMode(!cli.common.no_color);
    let json = cli.common.json;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Verify {
            title,
            year,
            author,
            journal,
            doi,
        } => {
            let claim = CitationClaim {
                title,
                year,
                first_author: author,
                journal,
                doi,
            };
            let verifier = CitationVerifier::from_config(&config, client);
            let response = verifier.verify(&claim).await;
            if json {
                print_json(&mut out, &response)?;
            } else {
                output::print_verify(&mut out, &response, color)?;
            }
        }
        Command::Quotes {
            claims,
            pdf,
            pages,
            url,
        } => {
            let fetcher = Arc::new(HttpFetcher::new(client, config.http_timeout()));
            let validator = QuoteValidator::new(&config, pdf_backend(), fetcher);

            let response = match (read_claims(&claims)?, document_source(pdf, pages, url)?) {
                (ClaimsFile::Request(request), None) => validator.validate(request).await,
                (ClaimsFile::Request(request), Some(source)) => {
                    validator.validate_source(source, &request.paragraphs).await
                }
                (ClaimsFile::List(paragraphs), None) => {
                    validator
                        .validate(QuoteRequest {
                            paragraphs,
                            ..QuoteRequest::default()
                        })
                        .await
                }
                (ClaimsFile::List(paragraphs), Some(source)) => {
                    validator.validate_source(source, &paragraphs).await
                }
            };

            if json {
                print_json(&mut out, &response)?;
            } else {
                output::print_quotes(&mut out, &response, color)?;
            }
        }
        Command::Pubmed { query, retmax } => {
            let retmax =
                search::checked_retmax(Some(i64::from(retmax))).map_err(anyhow::Error::msg)?;
            let results = search::pubmed_search(&config, &client, &query, retmax)
                .await
                .context("PubMed search failed")?;
            if json {
                print_json(&mut out, &serde_json::json!({ "results": results }))?;
            } else {
                output::print_articles(&mut out, &results, color)?;
            }
        }
        Command::Crossref { title } => {
            let summary = search::crossref_by_title(&config, &client, &title)
                .await
                .context("Crossref lookup failed")?;
            if json {
                match summary {
                    Some(ref summary) => print_json(&mut out, summary)?,
                    None => print_json(&mut out, &serde_json::json!({}))?,
                }
            } else {
                output::print_crossref(&mut out, summary.as_ref(), color)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn print_json(w: &mut dyn Write, value: &impl serde::Serialize) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)?;
    Ok(())
}

fn read_claims(path: &Path) -> anyhow::Result<ClaimsFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read claims file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a claim list or request object", path.display()))
}

fn document_source(
    pdf: Option<PathBuf>,
    pages: Option<PathBuf>,
    url: Option<String>,
) -> anyhow::Result<Option<DocumentSource>> {
    if let Some(path) = pdf {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return Ok(Some(DocumentSource::Bytes(bytes)));
    }
    if let Some(path) = pages {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let pages: Vec<String> = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a list of page texts", path.display()))?;
        return Ok(Some(DocumentSource::PageTexts(pages)));
    }
    Ok(url.map(DocumentSource::Url))
}
