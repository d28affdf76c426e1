//! Enrichment orchestrator: fetch → rewrite → sanitize for feed entries.
//!
//! Two entry points share one pipeline and differ only in [`FailurePolicy`]:
//!
//! - [`Enricher::enrich_feed_entries`] - batch mode for freshly ingested
//!   entries. Best-effort: failures are logged and the entry keeps its content.
//!   Entries whose URL the feed already stored are never fetched again.
//! - [`Enricher::enrich_single_entry`] - on-demand mode for one stored entry.
//!   Failures are returned so the caller can show them to the user.
//!
//! Whatever happens during acquisition, every entry that comes out of the
//! pipeline has been rewritten and then sanitized, in that order.

mod error;
mod strategy;

pub use error::EnrichError;
pub use strategy::{FailurePolicy, Strategy};

use std::sync::Arc;

use crate::config::{Config, FetchLimits};
use crate::content::{
    build_client, fetch_remote_content, AmmoniaSanitizer, HttpScraper, Rewriter, RuleRewriter,
    Sanitizer, Scraper,
};
use crate::storage::{Entry, EntryStore, Feed};

/// Tally of a batch pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichReport {
    /// Entries that went through the pipeline (all of them)
    pub processed: usize,
    /// Entries skipped by the dedup gate
    pub duplicates: usize,
    /// Entries whose content was replaced by fetched content
    pub replaced: usize,
    /// Swallowed acquisition or dedup-lookup failures
    pub failures: usize,
}

#[derive(Debug, Default)]
struct PipelineOutcome {
    replaced: bool,
    failures: usize,
}

/// Runs the enrichment pipeline against a store and the four stages.
///
/// Configuration is passed in explicitly; swap any stage with the `with_*`
/// builders.
pub struct Enricher {
    client: reqwest::Client,
    limits: FetchLimits,
    store: Arc<dyn EntryStore>,
    scraper: Arc<dyn Scraper>,
    rewriter: Arc<dyn Rewriter>,
    sanitizer: Arc<dyn Sanitizer>,
}

impl Enricher {
    /// Build an enricher with the default stages ([`HttpScraper`],
    /// [`RuleRewriter`], [`AmmoniaSanitizer`]).
    pub fn new(config: &Config, store: Arc<dyn EntryStore>) -> reqwest::Result<Self> {
        let client = build_client(config)?;
        Ok(Self {
            scraper: Arc::new(HttpScraper::new(config)?),
            client,
            limits: config.fetch_limits(),
            store,
            rewriter: Arc::new(RuleRewriter),
            sanitizer: Arc::new(AmmoniaSanitizer),
        })
    }

    pub fn with_scraper(mut self, scraper: Arc<dyn Scraper>) -> Self {
        self.scraper = scraper;
        self
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn Rewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    /// Batch mode: enrich freshly ingested entries of `feed` in place.
    ///
    /// Entries are processed one after another. Never fails; see the returned
    /// report for what happened.
    pub async fn enrich_feed_entries(&self, feed: &Feed, entries: &mut [Entry]) -> EnrichReport {
        let selected = Strategy::for_batch(feed);
        let mut report = EnrichReport::default();

        for entry in entries.iter_mut() {
            report.processed += 1;

            let strategies: &[Strategy] = if selected.is_empty() {
                &[]
            } else {
                match self.store.entry_url_exists(feed.id, &entry.url).await {
                    Ok(false) => selected.as_slice(),
                    Ok(true) => {
                        tracing::debug!(
                            feed_id = feed.id,
                            entry_url = %entry.url,
                            "Entry already stored, skipping fetch"
                        );
                        report.duplicates += 1;
                        &[]
                    }
                    Err(source) => {
                        let err = EnrichError::DedupLookup {
                            url: entry.url.clone(),
                            source,
                        };
                        tracing::warn!(feed_id = feed.id, error = %err, "Skipping fetch");
                        report.failures += 1;
                        &[]
                    }
                }
            };

            let outcome = self.run_best_effort(feed, entry, strategies).await;
            if outcome.replaced {
                report.replaced += 1;
            }
            report.failures += outcome.failures;
        }

        tracing::info!(
            feed_id = feed.id,
            processed = report.processed,
            duplicates = report.duplicates,
            replaced = report.replaced,
            failures = report.failures,
            "Enriched feed entries"
        );
        report
    }

    /// On-demand mode: fetch full content for one stored entry now.
    ///
    /// Uses the remote API when the feed enables it, the local scraper
    /// otherwise. The dedup gate is not consulted.
    ///
    /// # Errors
    ///
    /// Any acquisition failure. The entry is left untouched in that case.
    /// [`EnrichError::is_configuration`] tells configuration problems apart
    /// from transient ones.
    pub async fn enrich_single_entry(
        &self,
        feed: &Feed,
        entry: &mut Entry,
    ) -> Result<(), EnrichError> {
        let strategy = Strategy::for_single(feed);
        self.run_pipeline(feed, entry, &[strategy], FailurePolicy::Propagate)
            .await?;
        Ok(())
    }

    /// Batch flavor of [`Self::run_pipeline`]. Under `LogAndContinue` every
    /// acquisition error is logged and counted in the outcome, so the pipeline
    /// has no error left to return.
    async fn run_best_effort(
        &self,
        feed: &Feed,
        entry: &mut Entry,
        strategies: &[Strategy],
    ) -> PipelineOutcome {
        self.run_pipeline(feed, entry, strategies, FailurePolicy::LogAndContinue)
            .await
            .unwrap_or_default()
    }

    async fn run_pipeline(
        &self,
        feed: &Feed,
        entry: &mut Entry,
        strategies: &[Strategy],
        policy: FailurePolicy,
    ) -> Result<PipelineOutcome, EnrichError> {
        let mut outcome = PipelineOutcome::default();

        for &strategy in strategies {
            match self.acquire(strategy, feed, entry).await {
                Ok(content) if content.is_empty() => {
                    tracing::debug!(
                        entry_url = %entry.url,
                        ?strategy,
                        "No content returned, keeping current content"
                    );
                }
                Ok(content) => {
                    entry.content = content;
                    outcome.replaced = true;
                }
                Err(err) => match policy {
                    FailurePolicy::Propagate => return Err(err),
                    FailurePolicy::LogAndContinue if err.is_unavailable() => {
                        tracing::debug!(
                            entry_url = %entry.url,
                            reason = %err,
                            "Remote enrichment unavailable, skipping"
                        );
                    }
                    FailurePolicy::LogAndContinue => {
                        tracing::warn!(entry_url = %entry.url, ?strategy, error = %err, "Unable to fetch full content");
                        outcome.failures += 1;
                    }
                },
            }
        }

        self.finalize(feed, entry);
        Ok(outcome)
    }

    async fn acquire(
        &self,
        strategy: Strategy,
        feed: &Feed,
        entry: &Entry,
    ) -> Result<String, EnrichError> {
        match strategy {
            Strategy::LocalScrape => self
                .scraper
                .fetch(&entry.url, &feed.scraper_rules, &feed.user_agent)
                .await
                .map_err(|source| EnrichError::Scrape {
                    url: entry.url.clone(),
                    source,
                }),
            Strategy::RemoteFetch => {
                // Resolved on every call so endpoint changes apply immediately
                let user = self.store.user_by_id(entry.user_id).await.map_err(|source| {
                    EnrichError::UserLookup {
                        user_id: entry.user_id,
                        source,
                    }
                })?;
                let endpoint = user
                    .remote_endpoint()
                    .ok_or(EnrichError::MissingRemoteEndpoint(user.id))?;

                fetch_remote_content(&self.client, &entry.url, endpoint, self.limits)
                    .await
                    .map_err(|source| EnrichError::Fetch {
                        url: entry.url.clone(),
                        source,
                    })
            }
        }
    }

    fn finalize(&self, feed: &Feed, entry: &mut Entry) {
        let rewritten = self
            .rewriter
            .rewrite(&entry.url, &entry.content, &feed.rewrite_rules);
        // Must stay the last transformation before storage
        entry.content = self.sanitizer.sanitize(&entry.url, &rewritten);
    }
}
