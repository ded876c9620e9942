//! Per-guild AI feature bans.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::ids::id_to_db;

/// Repository for ai_bans table operations.
pub struct AiBanRepository;

impl AiBanRepository {
    pub async fn is_banned(pool: &SqlitePool, guild_id: u64, user_id: u64) -> DbResult<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM ai_bans WHERE guild_id = ? AND user_id = ? LIMIT 1")
                .bind(id_to_db(guild_id))
                .bind(id_to_db(user_id))
                .fetch_optional(pool)
                .await?;

        Ok(row.is_some())
    }

    /// Ban a user. Returns `false` if the user was already banned.
    pub async fn ban(pool: &SqlitePool, guild_id: u64, user_id: u64) -> DbResult<bool> {
        if Self::is_banned(pool, guild_id, user_id).await? {
            return Ok(false);
        }

        sqlx::query("INSERT INTO ai_bans (guild_id, user_id, created_at) VALUES (?, ?, ?)")
            .bind(id_to_db(guild_id))
            .bind(id_to_db(user_id))
            .bind(Utc::now().timestamp())
            .execute(pool)
            .await?;

        Ok(true)
    }

    /// Lift a ban. Returns `false` if no ban existed.
    pub async fn unban(pool: &SqlitePool, guild_id: u64, user_id: u64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM ai_bans WHERE guild_id = ? AND user_id = ?")
            .bind(id_to_db(guild_id))
            .bind(id_to_db(user_id))
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_db;

    const GUILD: u64 = 100;
    const USER: u64 = 200;

    #[tokio::test]
    async fn test_ban_is_idempotent_and_scoped_to_guild() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        assert!(AiBanRepository::ban(pool, GUILD, USER).await.unwrap());
        assert!(!AiBanRepository::ban(pool, GUILD, USER).await.unwrap());

        assert!(AiBanRepository::is_banned(pool, GUILD, USER).await.unwrap());
        assert!(!AiBanRepository::is_banned(pool, 999, USER).await.unwrap());
    }

    #[tokio::test]
    async fn test_unban_reports_whether_ban_existed() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        AiBanRepository::ban(pool, GUILD, USER).await.unwrap();

        assert!(AiBanRepository::unban(pool, GUILD, USER).await.unwrap());
        assert!(!AiBanRepository::unban(pool, GUILD, USER).await.unwrap());
        assert!(
            !AiBanRepository::is_banned(pool, GUILD, USER)
                .await
                .unwrap()
        );
    }
}
