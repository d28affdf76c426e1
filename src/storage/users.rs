use super::schema::Database;
use super::types::{DatabaseError, User};

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user (or return the existing one with that username)
    pub async fn create_user(&self, username: &str) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username) VALUES (?)
            ON CONFLICT(username) DO UPDATE SET username = excluded.username
            RETURNING id, username, remote_api_url
        "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn user_by_id(&self, user_id: i64) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT id, username, remote_api_url FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DatabaseError::NotFound {
                kind: "user",
                id: user_id,
            })
    }

    /// Set or clear the remote parser endpoint of a user.
    ///
    /// A blank string clears the endpoint. Takes effect on the next enrichment
    /// pass; feeds carry no copy of it.
    pub async fn set_user_remote_api_url(
        &self,
        user_id: i64,
        url: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let url = url.map(str::trim).filter(|u| !u.is_empty());
        let result = sqlx::query("UPDATE users SET remote_api_url = ? WHERE id = ?")
            .bind(url)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                kind: "user",
                id: user_id,
            });
        }
        tracing::debug!(user_id = user_id, configured = url.is_some(), "Updated remote API endpoint");
        Ok(())
    }
}
