use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process has locked the database
    #[error("The database is locked by another process. Please try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Lookup by primary key found nothing
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_CANTOPEN (14)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::InstanceLocked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// Account owning feeds. Carries the per-account remote parser endpoint.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub remote_api_url: Option<String>,
}

impl User {
    /// The configured remote endpoint, or `None` when unset or blank.
    pub fn remote_endpoint(&self) -> Option<&str> {
        self.remote_api_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Feed subscription with the per-feed enrichment settings.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Feed {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub feed_url: String,
    pub site_url: Option<String>,
    /// Fetch the origin page with the local scraper
    pub crawler: bool,
    /// Ask the owner's remote parser API for the full content
    pub remote_enrichment: bool,
    /// CSS selector list for the scraper; empty means automatic extraction
    pub scraper_rules: String,
    pub rewrite_rules: String,
    /// Empty means the configured default
    pub user_agent: String,
}

/// Settings for a new feed subscription
#[derive(Debug, Clone, Default)]
pub struct NewFeed {
    pub user_id: i64,
    pub title: String,
    pub feed_url: String,
    pub site_url: Option<String>,
    pub crawler: bool,
    pub remote_enrichment: bool,
    pub scraper_rules: String,
    pub rewrite_rules: String,
    pub user_agent: String,
}

/// One feed item. `content` is mutated in place by the enrichment pipeline.
///
/// `id` is 0 until the entry has been stored.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Entry {
    pub id: i64,
    pub feed_id: i64,
    pub user_id: i64,
    pub hash: String,
    pub title: String,
    pub url: String,
    pub content: String,
}

impl Entry {
    /// Build an unsaved entry belonging to `feed`.
    pub fn new(feed: &Feed, url: &str, title: &str, content: &str) -> Self {
        Self {
            id: 0,
            feed_id: feed.id,
            user_id: feed.user_id,
            hash: entry_hash(url),
            title: title.to_string(),
            url: url.to_string(),
            content: content.to_string(),
        }
    }
}

/// Entry as handed over by feed ingestion (JSON input of `enrich-feed`)
#[derive(Debug, Clone, Deserialize)]
pub struct IngestedEntry {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl IngestedEntry {
    pub fn into_entry(self, feed: &Feed) -> Entry {
        let title = if self.title.trim().is_empty() {
            "Untitled"
        } else {
            self.title.trim()
        };
        Entry::new(feed, self.url.trim(), title, &self.content)
    }
}

/// Stable identity hash of an entry URL within a feed.
pub fn entry_hash(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.trim().as_bytes()))
}
