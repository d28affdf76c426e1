//! Full-content enrichment for feed entries.
//!
//! Feeds often ship only a teaser. For feeds that opt in, the pipeline fetches
//! the full article either by scraping the origin page or through the owning
//! user's remote parser API, applies the feed's rewrite rules, and sanitizes
//! the result before it is stored.
//!
//! ```no_run
//! use std::sync::Arc;
//! use fulltext::{config::Config, storage::Database, Enricher};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let db = Database::open("fulltext.db").await?;
//! let enricher = Enricher::new(&Config::default(), Arc::new(db.clone()))?;
//! let feed = db.get_feed(1).await?;
//! let mut entry = db.get_entry(42).await?;
//! enricher.enrich_single_entry(&feed, &mut entry).await?;
//! db.update_entry_content(entry.id, &entry.content).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod content;
pub mod enrich;
pub mod storage;
pub mod util;

pub use enrich::{EnrichError, EnrichReport, Enricher, FailurePolicy, Strategy};
