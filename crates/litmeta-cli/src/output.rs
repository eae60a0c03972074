use std::io::Write;

use litmeta_core::search::{ArticleSummary, CrossrefSummary};
use litmeta_core::{
    ErrorReport, QuoteReport, QuoteResponse, SourceEntry, VerificationStatus,
    VerificationVerdict, VerifyResponse,
};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

pub fn print_error(
    w: &mut dyn Write,
    report: &ErrorReport,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}: {}", "ERROR".red().bold(), report.code, report.message)
    } else {
        writeln!(w, "ERROR {}: {}", report.code, report.message)
    }
}

pub fn print_verify(
    w: &mut dyn Write,
    response: &VerifyResponse,
    color: ColorMode,
) -> std::io::Result<()> {
    match response {
        VerifyResponse::Verdict(verdict) => print_verdict(w, verdict, color),
        VerifyResponse::Error(report) => print_error(w, report, color),
    }
}

fn print_verdict(
    w: &mut dyn Write,
    verdict: &VerificationVerdict,
    color: ColorMode,
) -> std::io::Result<()> {
    let year = match verdict.claim.year {
        0 => "year unknown".to_string(),
        y => y.to_string(),
    };
    writeln!(w, "Checking: \"{}\" ({})", verdict.claim.title, year)?;

    for entry in &verdict.sources {
        let via = entry.via();
        match entry {
            SourceEntry::Record(record) => {
                let matched = record.corroborates(verdict.claim.year);
                let mark = if matched { "match" } else { "no match" };
                if color.enabled() {
                    let mark = if matched {
                        mark.green().to_string()
                    } else {
                        mark.yellow().to_string()
                    };
                    writeln!(
                        w,
                        "  {:<8} {} (similarity {:.2}, {})",
                        via.as_str().bold(),
                        mark,
                        record.similarity,
                        record.year
                    )?;
                } else {
                    writeln!(
                        w,
                        "  {:<8} {} (similarity {:.2}, {})",
                        via.as_str(),
                        mark,
                        record.similarity,
                        record.year
                    )?;
                }
                writeln!(w, "           \"{}\"", record.title)?;
                if !record.url.is_empty() {
                    writeln!(w, "           {}", record.url)?;
                }
            }
            SourceEntry::NotFound { .. } => {
                if color.enabled() {
                    writeln!(w, "  {:<8} {}", via.as_str().bold(), "no result".dimmed())?;
                } else {
                    writeln!(w, "  {:<8} no result", via.as_str())?;
                }
            }
            SourceEntry::Failed { error, .. } => {
                if color.enabled() {
                    writeln!(
                        w,
                        "  {:<8} {}",
                        via.as_str().bold(),
                        format!("error: {error}").red()
                    )?;
                } else {
                    writeln!(w, "  {:<8} error: {}", via.as_str(), error)?;
                }
            }
        }
    }

    let mut label = verdict.status.as_str().to_uppercase();
    if color.enabled() {
        label = match verdict.status {
            VerificationStatus::Verified => label.green().bold().to_string(),
            VerificationStatus::Mismatch => label.red().bold().to_string(),
            VerificationStatus::Unverified => label.yellow().bold().to_string(),
        };
    }
    writeln!(w, "-> {}", label)
}

pub fn print_quotes(
    w: &mut dyn Write,
    response: &QuoteResponse,
    color: ColorMode,
) -> std::io::Result<()> {
    match response {
        QuoteResponse::Report(report) => print_quote_report(w, report, color),
        QuoteResponse::Error(report) => print_error(w, report, color),
    }
}

fn print_quote_report(
    w: &mut dyn Write,
    report: &QuoteReport,
    color: ColorMode,
) -> std::io::Result<()> {
    if let Some(pages) = report.pages_available {
        writeln!(w, "Document has {} pages", pages)?;
    }
    let summary = format!("{}/{} quotes found on their pages", report.matched, report.checked);
    if color.enabled() && report.mismatches.is_empty() {
        writeln!(w, "{}", summary.green())?;
    } else {
        writeln!(w, "{}", summary)?;
    }

    for mismatch in &report.mismatches {
        let quote = &mismatch.claim.source_quote;
        let short = match quote.char_indices().nth(60) {
            Some((idx, _)) => format!("{}...", &quote[..idx]),
            None => quote.clone(),
        };
        if color.enabled() {
            writeln!(
                w,
                "  {} page {}: \"{}\" ({})",
                "MISMATCH".red(),
                mismatch.claim.source_page,
                short,
                mismatch.reason.as_str().dimmed()
            )?;
        } else {
            writeln!(
                w,
                "  MISMATCH page {}: \"{}\" ({})",
                mismatch.claim.source_page,
                short,
                mismatch.reason.as_str()
            )?;
        }
    }
    Ok(())
}

pub fn print_articles(
    w: &mut dyn Write,
    articles: &[ArticleSummary],
    color: ColorMode,
) -> std::io::Result<()> {
    if articles.is_empty() {
        return writeln!(w, "No results");
    }
    for (i, article) in articles.iter().enumerate() {
        if color.enabled() {
            writeln!(w, "[{}] {}", i + 1, article.title.bold())?;
        } else {
            writeln!(w, "[{}] {}", i + 1, article.title)?;
        }
        writeln!(
            w,
            "    {} {} ({})",
            article.authors_short, article.journal, article.year
        )?;
        writeln!(w, "    {}  {}", article.doi_or_pmid, article.url)?;
    }
    Ok(())
}

pub fn print_crossref(
    w: &mut dyn Write,
    summary: Option<&CrossrefSummary>,
    color: ColorMode,
) -> std::io::Result<()> {
    let Some(summary) = summary else {
        return writeln!(w, "No results");
    };
    if color.enabled() {
        writeln!(w, "{}", summary.doi.bold())?;
    } else {
        writeln!(w, "{}", summary.doi)?;
    }
    writeln!(
        w,
        "    {} {} ({})",
        summary.authors_short, summary.journal, summary.year
    )?;
    writeln!(w, "    {}", summary.url)
}
