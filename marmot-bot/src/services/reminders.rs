//! Background delivery of scheduled reminders.
//!
//! A single sweep task wakes every 15 seconds, loads due rows (25 at a
//! time), and replies to the remembered message: the message the
//! command replied to when there was one, else the command message
//! itself, else a plain channel send. Delivered and undeliverable rows
//! are deleted; a delivery failure is logged and the sweep continues.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use marmot_db::{BotDb, DbResult, Reminder, ReminderRepository};
use serenity::http::Http;
use serenity::model::id::{ChannelId, MessageId};
use tokio::task::JoinHandle;
use tracing::{error, info};

const SWEEP_INTERVAL: Duration = Duration::from_secs(15);
const BATCH_LIMIT: i64 = 25;

pub struct ReminderScheduler {
    http: Arc<Http>,
    db: BotDb,
}

impl ReminderScheduler {
    pub fn new(http: Arc<Http>, db: BotDb) -> Self {
        Self { http, db }
    }

    /// Spawn the periodic sweep. The first sweep runs immediately.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Reminder scheduler started");
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(err) = self.process_due().await {
                    error!("Reminder sweep failed: {}", err);
                }
            }
        })
    }

    async fn process_due(&self) -> DbResult<()> {
        let due =
            ReminderRepository::due(self.db.pool(), Utc::now().timestamp(), BATCH_LIMIT).await?;
        for reminder in due {
            self.deliver(&reminder).await;
            ReminderRepository::delete(self.db.pool(), reminder.id).await?;
        }
        Ok(())
    }

    async fn deliver(&self, reminder: &Reminder) {
        let channel_id = ChannelId::new(reminder.channel_id);
        let mention = format!("<@{}> reminder requested.", reminder.user_id);

        let primary_id = reminder
            .parent_message_id
            .unwrap_or(reminder.command_message_id);
        let fallback_id = reminder
            .parent_message_id
            .map(|_| reminder.command_message_id);

        let target = match channel_id.message(&self.http, MessageId::new(primary_id)).await {
            Ok(message) => Some(message),
            Err(_) => match fallback_id {
                Some(id) => channel_id.message(&self.http, MessageId::new(id)).await.ok(),
                None => None,
            },
        };

        let outcome = match target {
            Some(message) => message.reply(&self.http, &mention).await.map(|_| ()),
            None => channel_id.say(&self.http, &mention).await.map(|_| ()),
        };

        if let Err(err) = outcome {
            error!("Failed to deliver reminder {}: {}", reminder.id, err);
        }
    }
}
