//! Per-user message-rate throttling.
//!
//! Moderators can put a user on slow mode, either in one channel or
//! guild-wide. Messages arriving faster than the configured delay are
//! deleted and the user is told at most once per hour why.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use marmot_db::{DbResult, SlowUser, SlowUserRepository};
use serenity::model::channel::Message;
use serenity::prelude::Context;
use sqlx::SqlitePool;
use tracing::{error, warn};

const NOTICE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Default)]
pub struct SlowModeService {
    // (guild, user) -> last time we explained the throttle to them
    notice_tracker: Mutex<HashMap<(u64, u64), Instant>>,
}

impl SlowModeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate an inbound message. Returns `true` when the message was
    /// throttled (deleted) and dispatch should stop.
    pub async fn handle_message(
        &self,
        ctx: &Context,
        pool: &SqlitePool,
        msg: &Message,
    ) -> DbResult<bool> {
        let Some(guild_id) = msg.guild_id.map(|g| g.get()) else {
            return Ok(false);
        };
        let user_id = msg.author.id.get();
        let channel_id = msg.channel_id.get();

        // Channel-specific record beats guild-wide.
        let record = match SlowUserRepository::find(pool, guild_id, user_id, Some(channel_id))
            .await?
        {
            Some(record) => Some(record),
            None => SlowUserRepository::find(pool, guild_id, user_id, None).await?,
        };
        let Some(record) = record else {
            return Ok(false);
        };

        let now = Utc::now().timestamp();
        let last = record.last_message_at.unwrap_or(0);
        if now - last < record.delay_seconds {
            if let Err(err) = msg.delete(&ctx.http).await {
                warn!("Failed to delete message for slow mode: {}", err);
            }
            self.maybe_notify(ctx, msg, &record).await;
            return Ok(true);
        }

        if let Err(err) = SlowUserRepository::touch(pool, record.id, now).await {
            error!("Failed to update slow mode timestamp: {}", err);
        }
        Ok(false)
    }

    async fn maybe_notify(&self, ctx: &Context, msg: &Message, record: &SlowUser) {
        if !self.should_notify_at((record.guild_id, record.user_id), Instant::now()) {
            return;
        }

        let notice = format!(
            "<@{}> you're on slow mode cooldown ({}s between messages).",
            record.user_id, record.delay_seconds
        );
        if let Err(err) = msg.channel_id.say(&ctx.http, notice).await {
            warn!("Failed to send slow mode notice: {}", err);
        }
    }

    fn should_notify_at(&self, key: (u64, u64), now: Instant) -> bool {
        let mut tracker = self.notice_tracker.lock().expect("notice tracker poisoned");
        match tracker.get(&key) {
            Some(last) if now.duration_since(*last) < NOTICE_INTERVAL => false,
            _ => {
                tracker.insert(key, now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_is_rate_limited_per_user() {
        let service = SlowModeService::new();
        let t0 = Instant::now();

        assert!(service.should_notify_at((1, 2), t0));
        assert!(!service.should_notify_at((1, 2), t0 + Duration::from_secs(30 * 60)));
        // Different user in the same guild is tracked separately.
        assert!(service.should_notify_at((1, 3), t0));
        assert!(service.should_notify_at((1, 2), t0 + Duration::from_secs(61 * 60)));
    }
}
