//! Schedule a reminder: `remind me <when>`.
//!
//! Only simple relative forms are understood ("in 2 hours", "90m",
//! "1 day 12 hours"); anything else gets a confused react.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use marmot_db::{NewReminder, ReminderRepository};
use serenity::model::channel::Message;

use crate::commands::{MessageCommand, MessageContext};
use crate::dispatch::{EMOJI_CONFUSED, react};
use crate::error::BotError;

const TRIGGER: &str = "remind me";

fn unit_secs(token: &str) -> Option<u64> {
    match token {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(3_600),
        "d" | "day" | "days" => Some(86_400),
        "w" | "week" | "weeks" => Some(604_800),
        _ => None,
    }
}

/// "2h" / "30min" style token.
fn split_suffixed(token: &str) -> Option<(u64, u64)> {
    let digits_end = token.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let value = token[..digits_end].parse::<u64>().ok()?;
    let unit = unit_secs(&token[digits_end..])?;
    Some((value, unit))
}

/// Parse a simple relative duration. Returns `None` for anything that
/// is not entirely made of number+unit pairs with a positive total.
fn parse_relative_duration(input: &str) -> Option<Duration> {
    let cleaned = input.trim().to_lowercase();
    let rest = cleaned.strip_prefix("in ").unwrap_or(cleaned.as_str());

    let mut total: u64 = 0;
    let mut pending: Option<u64> = None;
    for token in rest.split_whitespace() {
        let token = token.trim_end_matches(',');
        if let Some((value, unit)) = split_suffixed(token) {
            total = total.checked_add(value.checked_mul(unit)?)?;
            continue;
        }
        if let Ok(value) = token.parse::<u64>() {
            if pending.is_some() {
                return None;
            }
            pending = Some(value);
            continue;
        }
        if let Some(unit) = unit_secs(token) {
            let value = pending.take()?;
            total = total.checked_add(value.checked_mul(unit)?)?;
            continue;
        }
        return None;
    }

    if pending.is_some() || total == 0 {
        return None;
    }
    Some(Duration::from_secs(total))
}

pub struct RemindCommand;

#[async_trait]
impl MessageCommand for RemindCommand {
    fn name(&self) -> &str {
        "remind_me"
    }

    fn matches(&self, msg: &Message) -> bool {
        msg.content.trim().to_lowercase().starts_with(TRIGGER)
    }

    async fn run(&self, ctx: &MessageContext<'_>) -> Result<(), BotError> {
        let content = ctx.msg.content.trim();
        let input = content[TRIGGER.len().min(content.len())..].trim();

        let Some(duration) = parse_relative_duration(input) else {
            react(ctx.serenity, ctx.msg, EMOJI_CONFUSED).await;
            return Ok(());
        };
        let Some(guild_id) = ctx.guild_id() else {
            react(ctx.serenity, ctx.msg, EMOJI_CONFUSED).await;
            return Ok(());
        };

        let reminder = NewReminder {
            guild_id,
            channel_id: ctx.msg.channel_id.get(),
            user_id: ctx.user_id(),
            command_message_id: ctx.msg.id.get(),
            parent_message_id: ctx
                .msg
                .message_reference
                .as_ref()
                .and_then(|reference| reference.message_id)
                .map(|id| id.get()),
            remind_at: Utc::now().timestamp() + duration.as_secs() as i64,
        };
        ReminderRepository::schedule(ctx.state.db.pool(), &reminder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_simple_relative_forms() {
        assert_eq!(
            parse_relative_duration("in 2 hours"),
            Some(Duration::from_secs(7_200))
        );
        assert_eq!(
            parse_relative_duration("90m"),
            Some(Duration::from_secs(5_400))
        );
        assert_eq!(
            parse_relative_duration("1 day 12 hours"),
            Some(Duration::from_secs(129_600))
        );
        assert_eq!(
            parse_relative_duration("2h, 30min"),
            Some(Duration::from_secs(9_000))
        );
    }

    #[test]
    fn test_rejects_everything_else() {
        assert_eq!(parse_relative_duration(""), None);
        assert_eq!(parse_relative_duration("tomorrow"), None);
        assert_eq!(parse_relative_duration("5"), None);
        assert_eq!(parse_relative_duration("0 minutes"), None);
        assert_eq!(parse_relative_duration("next tuesday at noon"), None);
    }
}
