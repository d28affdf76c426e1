use async_trait::async_trait;

use super::schema::Database;
use super::types::{DatabaseError, User};

/// The storage lookups the enrichment pipeline depends on.
///
/// Implemented by [`Database`]; tests substitute in-memory doubles.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Dedup gate: true if `feed_id` already stored an entry with `url`.
    async fn entry_url_exists(&self, feed_id: i64, url: &str) -> Result<bool, DatabaseError>;

    async fn user_by_id(&self, user_id: i64) -> Result<User, DatabaseError>;
}

#[async_trait]
impl EntryStore for Database {
    async fn entry_url_exists(&self, feed_id: i64, url: &str) -> Result<bool, DatabaseError> {
        Database::entry_url_exists(self, feed_id, url).await
    }

    async fn user_by_id(&self, user_id: i64) -> Result<User, DatabaseError> {
        Database::user_by_id(self, user_id).await
    }
}
