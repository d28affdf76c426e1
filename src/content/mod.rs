//! Content acquisition and post-processing stages.
//!
//! - [`remote`] - full content from a remote parser API (`GET <endpoint>?url=...`)
//! - [`scraper`] - full content extracted locally from the origin page
//! - [`rewrite`] - per-feed rewrite rules
//! - [`sanitize`] - HTML allow-list cleaning, always the last stage

mod redirect;
pub mod remote;
pub mod rewrite;
pub mod sanitize;
pub mod scraper;

pub use redirect::{RedirectError, MAX_REDIRECTS};
pub use remote::{fetch_remote_content, ContentError, RemoteApiResponse};
pub use rewrite::{RuleRewriter, Rewriter};
pub use sanitize::{AmmoniaSanitizer, Sanitizer};
pub use self::scraper::{HttpScraper, ScrapeError, Scraper};

use futures::StreamExt;

use crate::config::Config;
use redirect::redirect_policy;

/// Build the HTTP client for the remote parser API.
///
/// The endpoint is user-configured and may live on a private network, so
/// redirects are bounded but their hosts are not checked. The client-level
/// timeout backs up the per-request `tokio::time::timeout`.
pub fn build_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    client_builder(config)
        .redirect(redirect_policy(false))
        .build()
}

/// Build the HTTP client for the local scraper.
///
/// Unless `allow_private_hosts` is set, every redirect target goes through
/// the same SSRF check as the entry URL itself.
pub fn build_scraper_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    client_builder(config)
        .redirect(redirect_policy(!config.allow_private_hosts))
        .build()
}

fn client_builder(config: &Config) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.default_user_agent.as_str())
}

/// Failure while streaming a response body under a size cap.
#[derive(Debug)]
pub(crate) enum BodyError {
    Network(reqwest::Error),
    TooLarge(usize),
}

/// Read a response body, failing as soon as it exceeds `limit` bytes.
pub(crate) async fn read_limited_body(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, BodyError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if usize::try_from(len).map_or(true, |len| len > limit) {
            return Err(BodyError::TooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(BodyError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(BodyError::TooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
