use super::schema::Database;
use super::types::{DatabaseError, Feed, NewFeed};

const FEED_COLUMNS: &str = "id, user_id, title, feed_url, site_url, crawler, remote_enrichment, \
                            scraper_rules, rewrite_rules, user_agent";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Insert a feed, or update its settings if the user already subscribes to the URL.
    /// Returns the feed ID either way.
    pub async fn insert_feed(&self, feed: &NewFeed) -> Result<i64, DatabaseError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO feeds (user_id, title, feed_url, site_url, crawler, remote_enrichment,
                               scraper_rules, rewrite_rules, user_agent)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, feed_url) DO UPDATE SET
                title = excluded.title,
                site_url = excluded.site_url,
                crawler = excluded.crawler,
                remote_enrichment = excluded.remote_enrichment,
                scraper_rules = excluded.scraper_rules,
                rewrite_rules = excluded.rewrite_rules,
                user_agent = excluded.user_agent
            RETURNING id
        "#,
        )
        .bind(feed.user_id)
        .bind(&feed.title)
        .bind(&feed.feed_url)
        .bind(&feed.site_url)
        .bind(feed.crawler)
        .bind(feed.remote_enrichment)
        .bind(&feed.scraper_rules)
        .bind(&feed.rewrite_rules)
        .bind(&feed.user_agent)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn get_feed(&self, feed_id: i64) -> Result<Feed, DatabaseError> {
        sqlx::query_as::<_, Feed>(&format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?"))
            .bind(feed_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DatabaseError::NotFound {
                kind: "feed",
                id: feed_id,
            })
    }

    /// All feeds of a user, ordered by title
    pub async fn get_feeds_for_user(&self, user_id: i64) -> Result<Vec<Feed>, DatabaseError> {
        let feeds = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE user_id = ? ORDER BY title"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(feeds)
    }
}
