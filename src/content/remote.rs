use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::{read_limited_body, BodyError};
use crate::config::FetchLimits;

/// Payload returned by a remote parser API.
///
/// Untrusted and free-form: every field is optional and only `content` is
/// consumed by the pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteApiResponse {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date_published: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Remote API request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid remote API endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("Remote API: unable to decode response: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ContentError {
    /// True for errors caused by the endpoint setting rather than the network.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ContentError::InvalidEndpoint(_))
    }
}

impl From<BodyError> for ContentError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::Network(e) => ContentError::Network(e),
            BodyError::TooLarge(limit) => ContentError::ResponseTooLarge(limit),
        }
    }
}

/// Fetch the full content of `entry_url` through a remote parser API.
///
/// Issues exactly one `GET <endpoint>?url=<entry_url>`: no retry, no cache.
/// Callers dedup through the storage gate before calling.
///
/// Returns `Ok(String::new())` when the API answers without content; that is
/// a valid "nothing better available" outcome, not an error.
pub async fn fetch_remote_content(
    client: &reqwest::Client,
    entry_url: &str,
    endpoint: &str,
    limits: FetchLimits,
) -> Result<String, ContentError> {
    let request_url = build_request_url(endpoint, entry_url)?;

    // The endpoint may embed credentials in its query; log the host only.
    tracing::debug!(
        entry_url = %entry_url,
        api_host = request_url.host_str().unwrap_or_default(),
        "Requesting content from remote API"
    );

    let response = tokio::time::timeout(limits.timeout, client.get(request_url).send())
        .await
        .map_err(|_| ContentError::Timeout(limits.timeout))?
        .map_err(ContentError::Network)?;

    if !response.status().is_success() {
        return Err(ContentError::HttpStatus(response.status().as_u16()));
    }

    let body = read_limited_body(response, limits.max_bytes).await?;
    let payload: RemoteApiResponse = serde_json::from_slice(&body).map_err(ContentError::Decode)?;

    let content = payload.content.unwrap_or_default();
    tracing::debug!(
        entry_url = %entry_url,
        content_len = content.len(),
        "Remote API responded"
    );
    Ok(content)
}

/// Append `url=<entry_url>` to the endpoint, keeping any query it already has.
fn build_request_url(endpoint: &str, entry_url: &str) -> Result<Url, ContentError> {
    let mut url = Url::parse(endpoint.trim())
        .map_err(|e| ContentError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ContentError::InvalidEndpoint(format!(
                "unsupported scheme {scheme} (only http/https allowed)"
            )))
        }
    }

    url.query_pairs_mut().append_pair("url", entry_url);
    Ok(url)
}
