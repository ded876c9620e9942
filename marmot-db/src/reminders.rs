//! Scheduled reminder storage.
//!
//! A reminder remembers which message to reply to when it fires: the
//! command message itself, or the message the command replied to when
//! there was one. Delivery (and deletion after delivery) is driven by
//! the bot's reminder scheduler.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::ids::{id_from_db, id_to_db, opt_id_from_db, opt_id_to_db};

/// Input for scheduling a reminder.
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub guild_id: u64,
    pub channel_id: u64,
    pub user_id: u64,
    pub command_message_id: u64,
    pub parent_message_id: Option<u64>,
    /// Unix seconds at which the reminder fires.
    pub remind_at: i64,
}

/// A stored reminder row.
#[derive(Debug, Clone)]
pub struct Reminder {
    pub id: i64,
    pub guild_id: u64,
    pub channel_id: u64,
    pub user_id: u64,
    pub command_message_id: u64,
    pub parent_message_id: Option<u64>,
    pub remind_at: i64,
    pub created_at: i64,
}

/// Repository for reminders table operations.
pub struct ReminderRepository;

impl ReminderRepository {
    pub async fn schedule(pool: &SqlitePool, reminder: &NewReminder) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO reminders (guild_id, channel_id, user_id, command_message_id, parent_message_id, remind_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id_to_db(reminder.guild_id))
        .bind(id_to_db(reminder.channel_id))
        .bind(id_to_db(reminder.user_id))
        .bind(id_to_db(reminder.command_message_id))
        .bind(opt_id_to_db(reminder.parent_message_id))
        .bind(reminder.remind_at)
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Reminders due at or before `now` (unix seconds), oldest first.
    pub async fn due(pool: &SqlitePool, now: i64, limit: i64) -> DbResult<Vec<Reminder>> {
        let rows = sqlx::query_as::<_, ReminderRow>(
            "SELECT id, guild_id, channel_id, user_id, command_message_id, parent_message_id, remind_at, created_at
             FROM reminders
             WHERE remind_at <= ?
             ORDER BY remind_at ASC
             LIMIT ?",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(Reminder::from).collect())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM reminders WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Number of reminders waiting to fire.
    pub async fn pending_count(pool: &SqlitePool) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reminders")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReminderRow {
    id: i64,
    guild_id: i64,
    channel_id: i64,
    user_id: i64,
    command_message_id: i64,
    parent_message_id: Option<i64>,
    remind_at: i64,
    created_at: i64,
}

impl From<ReminderRow> for Reminder {
    fn from(row: ReminderRow) -> Self {
        Reminder {
            id: row.id,
            guild_id: id_from_db(row.guild_id),
            channel_id: id_from_db(row.channel_id),
            user_id: id_from_db(row.user_id),
            command_message_id: id_from_db(row.command_message_id),
            parent_message_id: opt_id_from_db(row.parent_message_id),
            remind_at: row.remind_at,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_db;

    fn reminder(remind_at: i64) -> NewReminder {
        NewReminder {
            guild_id: 100,
            channel_id: 300,
            user_id: 200,
            command_message_id: 400,
            parent_message_id: Some(500),
            remind_at,
        }
    }

    #[tokio::test]
    async fn test_due_returns_only_elapsed_reminders_in_order() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        ReminderRepository::schedule(pool, &reminder(2_000))
            .await
            .unwrap();
        ReminderRepository::schedule(pool, &reminder(1_000))
            .await
            .unwrap();
        ReminderRepository::schedule(pool, &reminder(9_000))
            .await
            .unwrap();

        let due = ReminderRepository::due(pool, 5_000, 25).await.unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].remind_at, 1_000);
        assert_eq!(due[1].remind_at, 2_000);
        assert_eq!(due[0].parent_message_id, Some(500));
        assert_eq!(ReminderRepository::pending_count(pool).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_removes_reminder() {
        let db = create_test_db().await.unwrap();
        let pool = db.pool();

        ReminderRepository::schedule(pool, &reminder(1_000))
            .await
            .unwrap();
        let due = ReminderRepository::due(pool, 5_000, 25).await.unwrap();
        ReminderRepository::delete(pool, due[0].id).await.unwrap();

        assert!(
            ReminderRepository::due(pool, 5_000, 25)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
