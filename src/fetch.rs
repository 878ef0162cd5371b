//! Page-fetching collaborator.
//!
//! The pipeline only needs one thing from the network: give me the raw
//! text of a page, or a typed failure. [`Fetcher`] is that seam, and
//! [`HttpFetcher`] is the production implementation over a shared
//! `reqwest` client. No retry logic lives here; a failed site is skipped
//! by the driver and picked up again on the next scheduled run.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// The dining host challenges default library user agents, so the client
/// identifies as a desktop browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                                  (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a page fetch produced no text.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS, or timeout failure from the HTTP client.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The server answered, but not with a page.
    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Fetch a page's raw text by URL.
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Production [`Fetcher`] over a shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build the fetcher with its browser user agent and request timeout.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.text().await?;
        debug!(bytes = body.len(), "fetched page");
        Ok(body)
    }
}
