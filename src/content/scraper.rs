use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;

use super::{build_scraper_client, read_limited_body, BodyError};
use crate::config::{Config, FetchLimits};
use crate::util::validate_url;

/// Errors from fetching and extracting an origin page.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// A redirect hop was refused (private target, loop or too many hops)
    #[error("redirect rejected: {0}")]
    Redirect(#[source] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("response too large (exceeds {0} bytes)")]
    TooLarge(usize),
    #[error("not an HTML page: {0}")]
    NotHtml(String),
}

impl From<BodyError> for ScrapeError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::Network(e) => ScrapeError::Network(e),
            BodyError::TooLarge(limit) => ScrapeError::TooLarge(limit),
        }
    }
}

/// Local full-content strategy: fetch the origin page and extract the article.
///
/// An empty `Ok` means the page yielded nothing usable.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch(&self, url: &str, rules: &str, user_agent: &str)
        -> Result<String, ScrapeError>;
}

/// Default [`Scraper`]: reqwest fetch plus CSS selector extraction.
#[derive(Debug, Clone)]
pub struct HttpScraper {
    client: reqwest::Client,
    default_user_agent: String,
    limits: FetchLimits,
    allow_private_hosts: bool,
}

impl HttpScraper {
    /// Build a scraper with its own client, whose redirect policy re-checks
    /// every hop against the private-host guard.
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_scraper_client(config)?,
            default_user_agent: config.default_user_agent.clone(),
            limits: config.fetch_limits(),
            allow_private_hosts: config.allow_private_hosts,
        })
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    async fn fetch(
        &self,
        url: &str,
        rules: &str,
        user_agent: &str,
    ) -> Result<String, ScrapeError> {
        // SSRF guard: feed entries point at arbitrary hosts
        let page_url = if self.allow_private_hosts {
            url::Url::parse(url).map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?
        } else {
            validate_url(url).map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?
        };

        let user_agent = match user_agent.trim() {
            "" => self.default_user_agent.as_str(),
            custom => custom,
        };

        let request = self
            .client
            .get(page_url)
            .header(reqwest::header::USER_AGENT, user_agent);
        let response = tokio::time::timeout(self.limits.timeout, request.send())
            .await
            .map_err(|_| ScrapeError::Timeout(self.limits.timeout))?
            .map_err(|e| {
                if e.is_redirect() {
                    ScrapeError::Redirect(e)
                } else {
                    ScrapeError::Network(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(ScrapeError::HttpStatus(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        // Missing Content-Type is given the benefit of the doubt
        if !content_type.is_empty()
            && !content_type.contains("text/html")
            && !content_type.contains("application/xhtml")
        {
            return Err(ScrapeError::NotHtml(content_type));
        }

        let bytes = read_limited_body(response, self.limits.max_bytes).await?;
        let html = String::from_utf8_lossy(&bytes);
        let content = extract_content(&html, rules);

        tracing::debug!(
            url = %url,
            rules = %rules,
            content_len = content.len(),
            "Scraped page"
        );
        Ok(content)
    }
}

/// Extract the article body from a full page.
///
/// With rules, each element matched by the CSS selector list contributes its
/// inner HTML wrapped in a `<div>`. Without rules, or when the rules are not
/// valid CSS, the first `<article>` wins, then `<body>`.
pub fn extract_content(html: &str, rules: &str) -> String {
    let doc = Html::parse_document(html);
    let rules = rules.trim();

    if !rules.is_empty() {
        match Selector::parse(rules) {
            Ok(selector) => {
                return doc
                    .select(&selector)
                    .map(|node| format!("<div>{}</div>", node.inner_html()))
                    .collect();
            }
            Err(e) => {
                tracing::warn!(rules = %rules, error = %e, "Invalid scraper rules, using automatic extraction");
            }
        }
    }

    ["article", "body"]
        .iter()
        .filter_map(|tag| Selector::parse(tag).ok())
        .find_map(|sel| doc.select(&sel).next().map(|node| node.inner_html()))
        .map(|inner| inner.trim().to_string())
        .unwrap_or_default()
}
