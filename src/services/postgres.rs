use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::models::{ExclusionSet, ProfileId};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

/// A favorited profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub user_id: ProfileId,
    pub favorite_id: ProfileId,
    pub added_at: chrono::DateTime<chrono::Utc>,
}

/// PostgreSQL store for per-user bookkeeping
///
/// Holds everything a seed user accumulates while browsing: favorites,
/// blacklist, photo likes and the history of profiles already shown.
/// None of it expires; entries leave only through explicit removal.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Pool that connects on first use and never runs migrations
    #[cfg(test)]
    pub(crate) fn connect_lazy(
        database_url: &str,
        acquire_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    // === Favorites ===

    /// Add a profile to the user's favorites.
    ///
    /// Returns `false` when it was already there.
    pub async fn add_favorite(
        &self,
        user_id: ProfileId,
        favorite_id: ProfileId,
    ) -> Result<bool, PostgresError> {
        let query = r#"
            INSERT INTO favorites (user_id, favorite_id, added_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id, favorite_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(user_id)
            .bind(favorite_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Favorite {} -> {}: inserted={}",
            user_id,
            favorite_id,
            result.rows_affected() > 0
        );

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_favorite(
        &self,
        user_id: ProfileId,
        favorite_id: ProfileId,
    ) -> Result<bool, PostgresError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND favorite_id = $2")
            .bind(user_id)
            .bind(favorite_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Favorites, newest first
    pub async fn list_favorites(
        &self,
        user_id: ProfileId,
        limit: i64,
    ) -> Result<Vec<FavoriteRecord>, PostgresError> {
        let query = r#"
            SELECT user_id, favorite_id, added_at
            FROM favorites
            WHERE user_id = $1
            ORDER BY added_at DESC
            LIMIT $2
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| FavoriteRecord {
                user_id: row.get("user_id"),
                favorite_id: row.get("favorite_id"),
                added_at: row.get("added_at"),
            })
            .collect())
    }

    pub async fn is_favorite(
        &self,
        user_id: ProfileId,
        favorite_id: ProfileId,
    ) -> Result<bool, PostgresError> {
        let row = sqlx::query("SELECT 1 FROM favorites WHERE user_id = $1 AND favorite_id = $2")
            .bind(user_id)
            .bind(favorite_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    // === Blacklist ===

    /// Returns `false` when the profile was already blacklisted
    pub async fn add_to_blacklist(
        &self,
        user_id: ProfileId,
        banned_id: ProfileId,
    ) -> Result<bool, PostgresError> {
        let query = r#"
            INSERT INTO blacklist (user_id, banned_id, added_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id, banned_id) DO NOTHING
        "#;

        let result = sqlx::query(query)
            .bind(user_id)
            .bind(banned_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_from_blacklist(
        &self,
        user_id: ProfileId,
        banned_id: ProfileId,
    ) -> Result<bool, PostgresError> {
        let result = sqlx::query("DELETE FROM blacklist WHERE user_id = $1 AND banned_id = $2")
            .bind(user_id)
            .bind(banned_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_blacklist(&self, user_id: ProfileId) -> Result<Vec<ProfileId>, PostgresError> {
        let query = "SELECT banned_id FROM blacklist WHERE user_id = $1 ORDER BY added_at DESC";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("banned_id")).collect())
    }

    // === Photo likes ===

    /// Flip the like state of a photo; the first toggle likes it.
    ///
    /// Returns the new state.
    pub async fn toggle_photo_like(
        &self,
        user_id: ProfileId,
        photo_id: &str,
    ) -> Result<bool, PostgresError> {
        let query = r#"
            INSERT INTO photo_likes (user_id, photo_id, liked, updated_at)
            VALUES ($1, $2, TRUE, NOW())
            ON CONFLICT (user_id, photo_id)
            DO UPDATE SET
                liked = NOT photo_likes.liked,
                updated_at = EXCLUDED.updated_at
            RETURNING liked
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .bind(photo_id)
            .fetch_one(&self.pool)
            .await?;

        let liked: bool = row.get("liked");
        tracing::debug!("Photo {} liked by {}: {}", photo_id, user_id, liked);

        Ok(liked)
    }

    pub async fn get_photo_likes(
        &self,
        user_id: ProfileId,
    ) -> Result<HashMap<String, bool>, PostgresError> {
        let rows = sqlx::query("SELECT photo_id, liked FROM photo_likes WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("photo_id"), row.get("liked")))
            .collect())
    }

    // === View history ===

    /// Record that a ranked candidate was shown to the seed user
    pub async fn record_view(
        &self,
        user_id: ProfileId,
        viewed_id: ProfileId,
    ) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO view_history (user_id, viewed_id, viewed_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id, viewed_id)
            DO UPDATE SET viewed_at = EXCLUDED.viewed_at
        "#;

        sqlx::query(query)
            .bind(user_id)
            .bind(viewed_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Recorded view: {} -> {}", user_id, viewed_id);

        Ok(())
    }

    pub async fn remove_view(
        &self,
        user_id: ProfileId,
        viewed_id: ProfileId,
    ) -> Result<bool, PostgresError> {
        let result = sqlx::query("DELETE FROM view_history WHERE user_id = $1 AND viewed_id = $2")
            .bind(user_id)
            .bind(viewed_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Forget the whole view history of a user
    pub async fn clear_views(&self, user_id: ProfileId) -> Result<u64, PostgresError> {
        let result = sqlx::query("DELETE FROM view_history WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("Cleared {} viewed profiles for user {}", result.rows_affected(), user_id);

        Ok(result.rows_affected())
    }

    /// Load blacklist, favorites and view history in one round trip
    pub async fn get_exclusions(&self, user_id: ProfileId) -> Result<ExclusionSet, PostgresError> {
        let query = r#"
            SELECT 'blacklist' AS kind, banned_id AS target_id FROM blacklist WHERE user_id = $1
            UNION ALL
            SELECT 'favorite' AS kind, favorite_id AS target_id FROM favorites WHERE user_id = $1
            UNION ALL
            SELECT 'viewed' AS kind, viewed_id AS target_id FROM view_history WHERE user_id = $1
        "#;

        let rows = sqlx::query(query).bind(user_id).fetch_all(&self.pool).await?;

        let mut exclusions = ExclusionSet::default();
        for row in &rows {
            let kind: String = row.get("kind");
            let target_id: ProfileId = row.get("target_id");
            match kind.as_str() {
                "blacklist" => exclusions.blacklisted.insert(target_id),
                "favorite" => exclusions.favorited.insert(target_id),
                _ => exclusions.previously_viewed.insert(target_id),
            };
        }

        tracing::debug!(
            "Exclusions for {}: {} blacklisted, {} favorited, {} viewed",
            user_id,
            exclusions.blacklisted.len(),
            exclusions.favorited.len(),
            exclusions.previously_viewed.len()
        );

        Ok(exclusions)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
