use std::net::SocketAddr;
use std::sync::Arc;

use litmeta_core::{CitationVerifier, HttpFetcher, PdfBackend, QuoteValidator, config_file};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod app;
mod handlers;
mod state;

use state::AppState;

const DEFAULT_ADDR: &str = "0.0.0.0:8000";

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

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("litmeta_core=info,litmeta_web=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();

    let config = config_file::resolve();
    tracing::debug!(?config, "configuration resolved");

    let client = litmeta_core::build_http_client(&config)?;
    let pdf = pdf_backend();
    if pdf.is_none() {
        tracing::warn!("built without PDF extraction; only page_texts input is accepted");
    }

    let fetcher = Arc::new(HttpFetcher::new(client.clone(), config.http_timeout()));
    let state = Arc::new(AppState {
        verifier: CitationVerifier::from_config(&config, client.clone()),
        validator: QuoteValidator::new(&config, pdf, fetcher),
        client,
        config,
    });

    let app = app::router(state);

    let addr: SocketAddr = std::env::var("LITMETA_ADDR")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string())
        .parse()?;
    tracing::info!(%addr, version = litmeta_core::VERSION, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
