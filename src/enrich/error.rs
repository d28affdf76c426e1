use thiserror::Error;

use crate::content::{ContentError, ScrapeError};
use crate::storage::DatabaseError;

/// Why enriching an entry failed.
///
/// Only surfaced in on-demand mode; batch mode logs these and moves on.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The owning user could not be loaded
    #[error("unable to load user {user_id}: {source}")]
    UserLookup {
        user_id: i64,
        #[source]
        source: DatabaseError,
    },

    /// Remote enrichment is on for the feed but the user has no endpoint
    #[error("remote enrichment is enabled but no remote API endpoint is configured for user {0}")]
    MissingRemoteEndpoint(i64),

    #[error("remote API: unable to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: ContentError,
    },

    #[error("unable to scrape {url}: {source}")]
    Scrape {
        url: String,
        #[source]
        source: ScrapeError,
    },

    /// The dedup gate could not be consulted
    #[error("unable to check whether {url} is already stored: {source}")]
    DedupLookup {
        url: String,
        #[source]
        source: DatabaseError,
    },
}

impl EnrichError {
    /// True when the user should fix a setting rather than retry later.
    pub fn is_configuration(&self) -> bool {
        match self {
            EnrichError::MissingRemoteEndpoint(_) => true,
            EnrichError::Fetch { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// Remote enrichment cannot run for this user at all. Batch mode treats
    /// this as "feature unavailable" and stays silent.
    pub(crate) fn is_unavailable(&self) -> bool {
        matches!(
            self,
            EnrichError::UserLookup { .. } | EnrichError::MissingRemoteEndpoint(_)
        )
    }
}
