//! Document download for the quote validator's remote-URL input.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("only https URLs are accepted")]
    InsecureScheme,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("document exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Raw bytes of a fetched document and its declared content type.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<FetchedDocument, FetchError>> + Send + 'a>>;

/// Fetches a document by URL, giving up once `max_bytes` is exceeded.
pub trait DocumentFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a reqwest::Url, max_bytes: usize) -> FetchFuture<'a>;
}

/// [`DocumentFetcher`] backed by a shared reqwest client.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

impl DocumentFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a reqwest::Url, max_bytes: usize) -> FetchFuture<'a> {
        Box::pin(async move {
            if url.scheme() != "https" {
                return Err(FetchError::InsecureScheme);
            }

            let mut resp = self
                .client
                .get(url.clone())
                .timeout(self.timeout)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            if resp
                .content_length()
                .is_some_and(|len| len > max_bytes as u64)
            {
                return Err(FetchError::TooLarge { limit: max_bytes });
            }

            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from);

            let mut bytes = Vec::new();
            while let Some(chunk) = resp.chunk().await? {
                if bytes.len() + chunk.len() > max_bytes {
                    return Err(FetchError::TooLarge { limit: max_bytes });
                }
                bytes.extend_from_slice(&chunk);
            }

            tracing::debug!(url = %url, bytes = bytes.len(), "document fetched");
            Ok(FetchedDocument {
                bytes,
                content_type,
            })
        })
    }
}
