use crate::storage::Feed;

/// How full content is acquired for an entry.
///
/// A closed set selected by feed flags. "No strategy" is an empty selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Fetch the origin page and extract it locally
    LocalScrape,
    /// Ask the owner's remote parser API
    RemoteFetch,
}

impl Strategy {
    /// Strategies for a batch pass, in execution order.
    ///
    /// Both run when both flags are set; the remote result then overrides the
    /// scraped one.
    pub fn for_batch(feed: &Feed) -> Vec<Strategy> {
        let mut selected = Vec::with_capacity(2);
        if feed.crawler {
            selected.push(Strategy::LocalScrape);
        }
        if feed.remote_enrichment {
            selected.push(Strategy::RemoteFetch);
        }
        selected
    }

    /// The single strategy for an on-demand fetch: remote when enabled, local otherwise.
    pub fn for_single(feed: &Feed) -> Strategy {
        if feed.remote_enrichment {
            Strategy::RemoteFetch
        } else {
            Strategy::LocalScrape
        }
    }
}

/// What the pipeline does with a failed acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log, keep the current content, continue to rewrite and sanitize
    LogAndContinue,
    /// Return the error to the caller
    Propagate,
}
