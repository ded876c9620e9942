//! Usage and uptime statistics.

use std::time::Duration;

use async_trait::async_trait;
use marmot_db::{CommandUsageRepository, ReminderRepository};
use serenity::builder::{CreateCommand, CreateEmbed};
use serenity::model::id::UserId;

use crate::commands::{SlashCommand, SlashContext};
use crate::error::BotError;

const TOP_LIMIT: i64 = 5;
const STATS_COLOR: u32 = 0x2f9e44;

fn format_uptime(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{seconds}s"));
    parts.join(" ")
}

pub struct StatsCommand;

#[async_trait]
impl SlashCommand for StatsCommand {
    fn name(&self) -> &str {
        "stats"
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name()).description("Show bot statistics.")
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let pool = ctx.state.db.pool();
        let guild_id = ctx.guild_id();

        let uptime = format_uptime(ctx.state.started_at.elapsed());
        let reminder_count = ReminderRepository::pending_count(pool).await?;
        let top_users = CommandUsageRepository::top_users(pool, TOP_LIMIT, guild_id).await?;
        let top_commands = CommandUsageRepository::top_commands(pool, TOP_LIMIT, guild_id).await?;

        let mut user_lines = Vec::with_capacity(top_users.len());
        for entry in &top_users {
            let name = match UserId::new(entry.user_id).to_user(&ctx.serenity.http).await {
                Ok(user) => user.name,
                Err(_) => entry.user_id.to_string(),
            };
            user_lines.push(format!("{name} — {}", entry.count));
        }
        let command_lines: Vec<String> = top_commands
            .iter()
            .map(|entry| format!("{} — {}", entry.command_name, entry.count))
            .collect();

        let or_no_data = |lines: Vec<String>| {
            if lines.is_empty() {
                "No data".to_string()
            } else {
                lines.join("\n")
            }
        };

        let embed = CreateEmbed::new()
            .title("Bot Stats")
            .colour(STATS_COLOR)
            .field("Uptime", uptime, true)
            .field("Scheduled Reminders", reminder_count.to_string(), true)
            .field("Top Users", or_no_data(user_lines), false)
            .field("Top Commands", or_no_data(command_lines), false);

        ctx.respond_embeds("", vec![embed], false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime_skips_zero_leading_units() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0s");
        assert_eq!(format_uptime(Duration::from_secs(59)), "59s");
        assert_eq!(format_uptime(Duration::from_secs(61)), "1m 1s");
        assert_eq!(format_uptime(Duration::from_secs(3_600)), "1h 0s");
        assert_eq!(
            format_uptime(Duration::from_secs(90_061)),
            "1d 1h 1m 1s"
        );
    }
}
