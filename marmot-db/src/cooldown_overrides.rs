//! Persisted cooldown overrides.
//!
//! Administrators can replace the default cooldown of a registry for a
//! single (guild, user) key. Overrides survive restarts: at startup the
//! bot lists each registry's overrides and hydrates its in-memory state
//! from them.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::ids::{guild_from_db, guild_to_db, id_from_db, id_to_db};

/// A stored cooldown override.
#[derive(Debug, Clone)]
pub struct StoredCooldownOverride {
    pub guild_id: Option<u64>,
    pub user_id: u64,
    pub registry_name: String,
    pub cooldown_seconds: i64,
}

/// Repository for cooldown_overrides table operations.
pub struct CooldownOverrideRepository;

impl CooldownOverrideRepository {
    /// All overrides for one registry, oldest update first.
    pub async fn list_for_registry(
        pool: &SqlitePool,
        registry_name: &str,
    ) -> DbResult<Vec<StoredCooldownOverride>> {
        let rows = sqlx::query_as::<_, OverrideRow>(
            "SELECT guild_id, user_id, registry_name, cooldown_seconds
             FROM cooldown_overrides
             WHERE registry_name = ?
             ORDER BY updated_at ASC",
        )
        .bind(registry_name)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(StoredCooldownOverride::from).collect())
    }

    /// Insert or replace the override for (guild, user, registry).
    pub async fn set(
        pool: &SqlitePool,
        guild_id: Option<u64>,
        user_id: u64,
        registry_name: &str,
        cooldown_seconds: i64,
    ) -> DbResult<()> {
        let now = Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO cooldown_overrides (guild_id, user_id, registry_name, cooldown_seconds, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (guild_id, user_id, registry_name)
             DO UPDATE SET cooldown_seconds = excluded.cooldown_seconds, updated_at = excluded.updated_at",
        )
        .bind(guild_to_db(guild_id))
        .bind(id_to_db(user_id))
        .bind(registry_name)
        .bind(cooldown_seconds)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Remove an override. Returns whether one existed.
    pub async fn clear(
        pool: &SqlitePool,
        guild_id: Option<u64>,
        user_id: u64,
        registry_name: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "DELETE FROM cooldown_overrides WHERE guild_id = ? AND user_id = ? AND registry_name = ?",
        )
        .bind(guild_to_db(guild_id))
        .bind(id_to_db(user_id))
        .bind(registry_name)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OverrideRow {
    guild_id: i64,
    user_id: i64,
    registry_name: String,
    cooldown_seconds: i64,
}

impl From<OverrideRow> for StoredCooldownOverride {
    fn from(row: OverrideRow) -> Self {
        StoredCooldownOverride {
            guild_id: guild_from_db(row.guild_id),
            user_id: id_from_db(row.user_id),
            registry_name: row.registry_name,
            cooldown_seconds: row.cooldown_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_db;

    const GUILD: Option<u64> = Some(100);
    const USER: u64 = 200;

    #[tokio::test]
    async fn test_set_upserts_on_same_key() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        CooldownOverrideRepository::set(pool, GUILD, USER, "llm", 30)
            .await
            .unwrap();
        CooldownOverrideRepository::set(pool, GUILD, USER, "llm", 45)
            .await
            .unwrap();

        let overrides = CooldownOverrideRepository::list_for_registry(pool, "llm")
            .await
            .unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].cooldown_seconds, 45);
        assert_eq!(overrides[0].guild_id, GUILD);
        assert_eq!(overrides[0].user_id, USER);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_registry() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        CooldownOverrideRepository::set(pool, GUILD, USER, "llm", 30)
            .await
            .unwrap();
        CooldownOverrideRepository::set(pool, GUILD, USER, "wiki", 10)
            .await
            .unwrap();

        let overrides = CooldownOverrideRepository::list_for_registry(pool, "wiki")
            .await
            .unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].registry_name, "wiki");
    }

    #[tokio::test]
    async fn test_dm_scope_round_trips_as_none() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        CooldownOverrideRepository::set(pool, None, USER, "llm", 30)
            .await
            .unwrap();

        let overrides = CooldownOverrideRepository::list_for_registry(pool, "llm")
            .await
            .unwrap();
        assert_eq!(overrides[0].guild_id, None);

        assert!(
            CooldownOverrideRepository::clear(pool, None, USER, "llm")
                .await
                .unwrap()
        );
        assert!(
            !CooldownOverrideRepository::clear(pool, None, USER, "llm")
                .await
                .unwrap()
        );
    }
}
