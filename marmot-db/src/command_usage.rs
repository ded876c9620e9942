//! Command usage telemetry.
//!
//! Every dispatched command records one row: who ran what, where, and
//! with which parameters (already serialized to JSON by the caller).
//! The stats command aggregates these rows.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use crate::ids::{guild_to_db, id_from_db, id_to_db, opt_id_to_db};

/// How a command was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Slash,
    Message,
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandKind::Slash => write!(f, "slash"),
            CommandKind::Message => write!(f, "message"),
        }
    }
}

impl std::str::FromStr for CommandKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slash" => Ok(CommandKind::Slash),
            "message" => Ok(CommandKind::Message),
            _ => Err(DbError::Decode(format!("invalid command kind: {s}"))),
        }
    }
}

/// One usage event to record.
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub guild_id: Option<u64>,
    pub user_id: u64,
    pub command_name: String,
    pub command_kind: CommandKind,
    /// Invocation parameters serialized as JSON.
    pub parameters: String,
    pub channel_id: Option<u64>,
    pub message_id: Option<u64>,
}

/// Aggregated usage count per user.
#[derive(Debug, Clone)]
pub struct UserUsageCount {
    pub user_id: u64,
    pub count: i64,
}

/// Aggregated usage count per command.
#[derive(Debug, Clone)]
pub struct CommandUsageCount {
    pub command_name: String,
    pub count: i64,
}

/// Repository for command_usage table operations.
pub struct CommandUsageRepository;

impl CommandUsageRepository {
    pub async fn record(pool: &SqlitePool, event: &UsageEvent) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO command_usage (guild_id, user_id, command_name, command_type, parameters, channel_id, message_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(guild_to_db(event.guild_id))
        .bind(id_to_db(event.user_id))
        .bind(&event.command_name)
        .bind(event.command_kind.to_string())
        .bind(&event.parameters)
        .bind(opt_id_to_db(event.channel_id))
        .bind(opt_id_to_db(event.message_id))
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Most active users, optionally scoped to one guild.
    pub async fn top_users(
        pool: &SqlitePool,
        limit: i64,
        guild_id: Option<u64>,
    ) -> DbResult<Vec<UserUsageCount>> {
        let rows: Vec<(i64, i64)> = match guild_id {
            Some(guild_id) => {
                sqlx::query_as(
                    "SELECT user_id, COUNT(*) as count FROM command_usage
                     WHERE guild_id = ?
                     GROUP BY user_id ORDER BY count DESC LIMIT ?",
                )
                .bind(id_to_db(guild_id))
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT user_id, COUNT(*) as count FROM command_usage
                     GROUP BY user_id ORDER BY count DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|(user_id, count)| UserUsageCount {
                user_id: id_from_db(user_id),
                count,
            })
            .collect())
    }

    /// Most used commands, optionally scoped to one guild.
    pub async fn top_commands(
        pool: &SqlitePool,
        limit: i64,
        guild_id: Option<u64>,
    ) -> DbResult<Vec<CommandUsageCount>> {
        let rows: Vec<(String, i64)> = match guild_id {
            Some(guild_id) => {
                sqlx::query_as(
                    "SELECT command_name, COUNT(*) as count FROM command_usage
                     WHERE guild_id = ?
                     GROUP BY command_name ORDER BY count DESC LIMIT ?",
                )
                .bind(id_to_db(guild_id))
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT command_name, COUNT(*) as count FROM command_usage
                     GROUP BY command_name ORDER BY count DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|(command_name, count)| CommandUsageCount {
                command_name,
                count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_db;

    fn event(guild_id: Option<u64>, user_id: u64, command_name: &str) -> UsageEvent {
        UsageEvent {
            guild_id,
            user_id,
            command_name: command_name.to_string(),
            command_kind: CommandKind::Message,
            parameters: "{}".to_string(),
            channel_id: Some(300),
            message_id: Some(400),
        }
    }

    #[tokio::test]
    async fn test_top_users_ordered_by_count() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        for _ in 0..3 {
            CommandUsageRepository::record(pool, &event(Some(100), 1, "answer"))
                .await
                .unwrap();
        }
        CommandUsageRepository::record(pool, &event(Some(100), 2, "wiki"))
            .await
            .unwrap();

        let top = CommandUsageRepository::top_users(pool, 10, Some(100))
            .await
            .unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].user_id, 1);
        assert_eq!(top[0].count, 3);
        assert_eq!(top[1].user_id, 2);
    }

    #[tokio::test]
    async fn test_guild_scope_filters_rows() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        CommandUsageRepository::record(pool, &event(Some(100), 1, "answer"))
            .await
            .unwrap();
        CommandUsageRepository::record(pool, &event(Some(999), 2, "wiki"))
            .await
            .unwrap();

        let scoped = CommandUsageRepository::top_commands(pool, 10, Some(100))
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].command_name, "answer");

        let global = CommandUsageRepository::top_commands(pool, 10, None)
            .await
            .unwrap();
        assert_eq!(global.len(), 2);
    }

    #[test]
    fn test_command_kind_round_trip() {
        assert_eq!(CommandKind::Slash.to_string(), "slash");
        assert_eq!(
            "message".parse::<CommandKind>().unwrap(),
            CommandKind::Message
        );
        assert!("other".parse::<CommandKind>().is_err());
    }
}
