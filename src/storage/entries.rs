use sqlx::QueryBuilder;

use super::schema::Database;
use super::types::{DatabaseError, Entry};

/// Maximum number of entries returned by a single feed query (OOM protection)
const MAX_ENTRIES: i64 = 2000;

impl Database {
    // ========================================================================
    // Entry Operations
    // ========================================================================

    /// Insert new entries, returns the number actually inserted.
    ///
    /// Entries whose `(feed_id, hash)` is already stored keep their stored
    /// content; only the title is refreshed. Batches of 50 keep us well under
    /// SQLite's 999 parameter limit (7 columns * 50 = 350).
    pub async fn upsert_entries(&self, entries: &[Entry]) -> Result<usize, DatabaseError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        const BATCH_SIZE: usize = 50;
        let mut total_inserted: usize = 0;

        for chunk in entries.chunks(BATCH_SIZE) {
            let mut insert_builder: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO entries (feed_id, user_id, hash, title, url, content, created_at) ",
            );
            insert_builder.push_values(chunk, |mut b, entry| {
                b.push_bind(entry.feed_id)
                    .push_bind(entry.user_id)
                    .push_bind(&entry.hash)
                    .push_bind(&entry.title)
                    .push_bind(&entry.url)
                    .push_bind(&entry.content)
                    .push_bind(now);
            });
            insert_builder.build().execute(&mut *tx).await?;

            let changes: (i64,) = sqlx::query_as("SELECT changes()")
                .fetch_one(&mut *tx)
                .await?;
            total_inserted += changes.0 as usize;

            for entry in chunk {
                sqlx::query("UPDATE entries SET title = ? WHERE feed_id = ? AND hash = ?")
                    .bind(&entry.title)
                    .bind(entry.feed_id)
                    .bind(&entry.hash)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(total_inserted)
    }

    pub async fn get_entry(&self, entry_id: i64) -> Result<Entry, DatabaseError> {
        sqlx::query_as::<_, Entry>(
            "SELECT id, feed_id, user_id, hash, title, url, content FROM entries WHERE id = ?",
        )
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound {
            kind: "entry",
            id: entry_id,
        })
    }

    /// Entries of a feed, newest first, capped at MAX_ENTRIES
    pub async fn get_entries_for_feed(
        &self,
        feed_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Entry>, DatabaseError> {
        let limit = limit.unwrap_or(500).min(MAX_ENTRIES);
        let entries = sqlx::query_as::<_, Entry>(
            r#"
            SELECT id, feed_id, user_id, hash, title, url, content
            FROM entries
            WHERE feed_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
        "#,
        )
        .bind(feed_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Dedup gate: has this feed already stored an entry with this URL?
    pub async fn entry_url_exists(&self, feed_id: i64, url: &str) -> Result<bool, DatabaseError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM entries WHERE feed_id = ? AND url = ?)",
        )
        .bind(feed_id)
        .bind(url)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn update_entry_content(
        &self,
        entry_id: i64,
        content: &str,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE entries SET content = ? WHERE id = ?")
            .bind(content)
            .bind(entry_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                kind: "entry",
                id: entry_id,
            });
        }
        Ok(())
    }

    /// Persist the content of several stored entries in one transaction.
    /// Unsaved entries (`id == 0`) are skipped.
    pub async fn update_entries_content(&self, entries: &[Entry]) -> Result<usize, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for entry in entries.iter().filter(|e| e.id != 0) {
            let result = sqlx::query("UPDATE entries SET content = ? WHERE id = ?")
                .bind(&entry.content)
                .bind(entry.id)
                .execute(&mut *tx)
                .await?;
            updated += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Feed, NewFeed};

    async fn seed() -> (Database, Feed) {
        let db = Database::open(":memory:").await.unwrap();
        let user = db.create_user("alice").await.unwrap();
        let feed_id = db
            .insert_feed(&NewFeed {
                user_id: user.id,
                title: "Example".to_string(),
                feed_url: "https://example.com/feed.xml".to_string(),
                ..NewFeed::default()
            })
            .await
            .unwrap();
        let feed = db.get_feed(feed_id).await.unwrap();
        (db, feed)
    }

    #[tokio::test]
    async fn test_upsert_counts_only_new_entries() {
        let (db, feed) = seed().await;
        let entries = vec![
            Entry::new(&feed, "https://example.com/a", "A", "<p>a</p>"),
            Entry::new(&feed, "https://example.com/b", "B", "<p>b</p>"),
        ];

        assert_eq!(db.upsert_entries(&entries).await.unwrap(), 2);
        assert_eq!(db.upsert_entries(&entries).await.unwrap(), 0);
        assert_eq!(db.get_entries_for_feed(feed.id, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_preserves_stored_content() {
        let (db, feed) = seed().await;
        let original = Entry::new(&feed, "https://example.com/a", "A", "<p>full text</p>");
        db.upsert_entries(&[original]).await.unwrap();

        let again = Entry::new(&feed, "https://example.com/a", "A (updated)", "<p>summary</p>");
        db.upsert_entries(&[again]).await.unwrap();

        let stored = db.get_entries_for_feed(feed.id, None).await.unwrap();
        assert_eq!(stored[0].title, "A (updated)");
        assert_eq!(stored[0].content, "<p>full text</p>");
    }

    #[tokio::test]
    async fn test_entry_url_exists_is_scoped_to_feed() {
        let (db, feed) = seed().await;
        assert!(!db.entry_url_exists(feed.id, "https://example.com/a").await.unwrap());

        db.upsert_entries(&[Entry::new(&feed, "https://example.com/a", "A", "")])
            .await
            .unwrap();

        assert!(db.entry_url_exists(feed.id, "https://example.com/a").await.unwrap());
        assert!(!db.entry_url_exists(feed.id + 1, "https://example.com/a").await.unwrap());
        assert!(!db.entry_url_exists(feed.id, "https://example.com/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_entry_content() {
        let (db, feed) = seed().await;
        db.upsert_entries(&[Entry::new(&feed, "https://example.com/a", "A", "old")])
            .await
            .unwrap();
        let mut entry = db.get_entries_for_feed(feed.id, None).await.unwrap().remove(0);

        db.update_entry_content(entry.id, "new").await.unwrap();
        assert_eq!(db.get_entry(entry.id).await.unwrap().content, "new");

        entry.content = "batch".to_string();
        let unsaved = Entry::new(&feed, "https://example.com/z", "Z", "ignored");
        assert_eq!(db.update_entries_content(&[entry.clone(), unsaved]).await.unwrap(), 1);
        assert_eq!(db.get_entry(entry.id).await.unwrap().content, "batch");

        assert!(matches!(
            db.update_entry_content(9999, "x").await,
            Err(DatabaseError::NotFound { kind: "entry", .. })
        ));
    }
}
