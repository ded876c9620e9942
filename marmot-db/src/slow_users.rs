//! Per-user slow-mode records.
//!
//! A slow-mode record limits how often a user may post, either in one
//! channel (`channel_id` set) or guild-wide (`channel_id` NULL). A
//! channel-specific record takes precedence over a guild-wide one; the
//! lookup for that lives in the bot's slow-mode service, this module
//! only stores the rows.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::ids::{id_from_db, id_to_db, opt_id_from_db, opt_id_to_db};

/// A slow-mode row.
#[derive(Debug, Clone)]
pub struct SlowUser {
    pub id: i64,
    pub guild_id: u64,
    pub user_id: u64,
    pub channel_id: Option<u64>,
    pub delay_seconds: i64,
    pub last_message_at: Option<i64>,
    pub created_at: i64,
}

/// Repository for slow_users table operations.
pub struct SlowUserRepository;

impl SlowUserRepository {
    /// Create or update a slow-mode record for (guild, user, channel).
    ///
    /// Updating an existing record replaces the delay and resets the
    /// last-message timestamp so the new delay applies immediately.
    pub async fn set(
        pool: &SqlitePool,
        guild_id: u64,
        user_id: u64,
        channel_id: Option<u64>,
        delay_seconds: i64,
    ) -> DbResult<()> {
        if let Some(existing) = Self::find(pool, guild_id, user_id, channel_id).await? {
            sqlx::query(
                "UPDATE slow_users SET delay_seconds = ?, last_message_at = NULL WHERE id = ?",
            )
            .bind(delay_seconds)
            .bind(existing.id)
            .execute(pool)
            .await?;
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO slow_users (guild_id, user_id, channel_id, delay_seconds, last_message_at, created_at)
             VALUES (?, ?, ?, ?, NULL, ?)",
        )
        .bind(id_to_db(guild_id))
        .bind(id_to_db(user_id))
        .bind(opt_id_to_db(channel_id))
        .bind(delay_seconds)
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Delete a slow-mode record. Returns whether a row was removed.
    pub async fn remove(
        pool: &SqlitePool,
        guild_id: u64,
        user_id: u64,
        channel_id: Option<u64>,
    ) -> DbResult<bool> {
        let result = match channel_id {
            Some(channel_id) => {
                sqlx::query(
                    "DELETE FROM slow_users WHERE guild_id = ? AND user_id = ? AND channel_id = ?",
                )
                .bind(id_to_db(guild_id))
                .bind(id_to_db(user_id))
                .bind(id_to_db(channel_id))
                .execute(pool)
                .await?
            }
            None => {
                sqlx::query(
                    "DELETE FROM slow_users WHERE guild_id = ? AND user_id = ? AND channel_id IS NULL",
                )
                .bind(id_to_db(guild_id))
                .bind(id_to_db(user_id))
                .execute(pool)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    /// Find the record for exactly (guild, user, channel). `None` for
    /// `channel_id` matches only the guild-wide row.
    pub async fn find(
        pool: &SqlitePool,
        guild_id: u64,
        user_id: u64,
        channel_id: Option<u64>,
    ) -> DbResult<Option<SlowUser>> {
        let row = match channel_id {
            Some(channel_id) => {
                sqlx::query_as::<_, SlowUserRow>(
                    "SELECT id, guild_id, user_id, channel_id, delay_seconds, last_message_at, created_at
                     FROM slow_users
                     WHERE guild_id = ? AND user_id = ? AND channel_id = ?
                     LIMIT 1",
                )
                .bind(id_to_db(guild_id))
                .bind(id_to_db(user_id))
                .bind(id_to_db(channel_id))
                .fetch_optional(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SlowUserRow>(
                    "SELECT id, guild_id, user_id, channel_id, delay_seconds, last_message_at, created_at
                     FROM slow_users
                     WHERE guild_id = ? AND user_id = ? AND channel_id IS NULL
                     LIMIT 1",
                )
                .bind(id_to_db(guild_id))
                .bind(id_to_db(user_id))
                .fetch_optional(pool)
                .await?
            }
        };

        Ok(row.map(SlowUser::from))
    }

    /// Record that the user posted at `at` (unix seconds).
    pub async fn touch(pool: &SqlitePool, id: i64, at: i64) -> DbResult<()> {
        sqlx::query("UPDATE slow_users SET last_message_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SlowUserRow {
    id: i64,
    guild_id: i64,
    user_id: i64,
    channel_id: Option<i64>,
    delay_seconds: i64,
    last_message_at: Option<i64>,
    created_at: i64,
}

impl From<SlowUserRow> for SlowUser {
    fn from(row: SlowUserRow) -> Self {
        SlowUser {
            id: row.id,
            guild_id: id_from_db(row.guild_id),
            user_id: id_from_db(row.user_id),
            channel_id: opt_id_from_db(row.channel_id),
            delay_seconds: row.delay_seconds,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_db;

    const GUILD: u64 = 100;
    const USER: u64 = 200;
    const CHANNEL: u64 = 300;

    #[tokio::test]
    async fn test_set_and_find_guild_wide() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        SlowUserRepository::set(pool, GUILD, USER, None, 30)
            .await
            .unwrap();

        let found = SlowUserRepository::find(pool, GUILD, USER, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.delay_seconds, 30);
        assert!(found.channel_id.is_none());
        assert!(found.last_message_at.is_none());

        // Channel-specific lookup must not match the guild-wide row.
        let channel_row = SlowUserRepository::find(pool, GUILD, USER, Some(CHANNEL))
            .await
            .unwrap();
        assert!(channel_row.is_none());
    }

    #[tokio::test]
    async fn test_set_existing_resets_last_message() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        SlowUserRepository::set(pool, GUILD, USER, Some(CHANNEL), 30)
            .await
            .unwrap();
        let row = SlowUserRepository::find(pool, GUILD, USER, Some(CHANNEL))
            .await
            .unwrap()
            .unwrap();
        SlowUserRepository::touch(pool, row.id, 1_700_000_000)
            .await
            .unwrap();

        SlowUserRepository::set(pool, GUILD, USER, Some(CHANNEL), 60)
            .await
            .unwrap();

        let updated = SlowUserRepository::find(pool, GUILD, USER, Some(CHANNEL))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, row.id);
        assert_eq!(updated.delay_seconds, 60);
        assert!(updated.last_message_at.is_none());
    }

    #[tokio::test]
    async fn test_remove_reports_whether_row_existed() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        SlowUserRepository::set(pool, GUILD, USER, None, 30)
            .await
            .unwrap();

        assert!(
            SlowUserRepository::remove(pool, GUILD, USER, None)
                .await
                .unwrap()
        );
        assert!(
            !SlowUserRepository::remove(pool, GUILD, USER, None)
                .await
                .unwrap()
        );
    }
}
