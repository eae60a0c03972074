use litmeta_core::{CitationVerifier, Config, QuoteValidator};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub config: Config,
    pub client: reqwest::Client,
    pub verifier: CitationVerifier,
    pub validator: QuoteValidator,
}
