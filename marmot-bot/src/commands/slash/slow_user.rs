//! Moderator controls for per-user slow mode.

use async_trait::async_trait;
use marmot_db::SlowUserRepository;
use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::model::application::CommandOptionType;

use super::GUILD_ONLY;
use crate::commands::{SlashCommand, SlashContext};
use crate::error::BotError;

pub struct SlowUserCommand {
    moderator_role_ids: Vec<u64>,
}

impl SlowUserCommand {
    pub fn new(moderator_role_ids: Vec<u64>) -> Self {
        Self { moderator_role_ids }
    }
}

#[async_trait]
impl SlashCommand for SlowUserCommand {
    fn name(&self) -> &str {
        "slowuser"
    }

    fn allowed_role_ids(&self) -> &[u64] {
        &self.moderator_role_ids
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name())
            .description("Put a user on slow mode.")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "User to slow down")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    "delay",
                    "Seconds required between messages",
                )
                .min_int_value(1)
                .required(true),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::Channel,
                "channel",
                "Limit to one channel (default: whole server)",
            ))
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let Some(guild_id) = ctx.guild_id() else {
            return ctx.respond_text(GUILD_ONLY, true).await;
        };
        let user_id = ctx
            .user_option("user")
            .ok_or_else(|| BotError::Command("Missing required option: user".to_string()))?;
        let delay = ctx
            .int_option("delay")
            .ok_or_else(|| BotError::Command("Missing required option: delay".to_string()))?
            .max(1);
        let channel_id = ctx.channel_option("channel");

        SlowUserRepository::set(ctx.state.db.pool(), guild_id, user_id, channel_id, delay).await?;

        let scope = match channel_id {
            Some(id) => format!(" in <#{id}>"),
            None => String::new(),
        };
        ctx.respond_text(
            format!("✅ <@{user_id}> is now on slow mode ({delay}s between messages){scope}."),
            true,
        )
        .await
    }
}

pub struct UnslowUserCommand {
    moderator_role_ids: Vec<u64>,
}

impl UnslowUserCommand {
    pub fn new(moderator_role_ids: Vec<u64>) -> Self {
        Self { moderator_role_ids }
    }
}

#[async_trait]
impl SlashCommand for UnslowUserCommand {
    fn name(&self) -> &str {
        "unslowuser"
    }

    fn allowed_role_ids(&self) -> &[u64] {
        &self.moderator_role_ids
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name())
            .description("Take a user off slow mode.")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "User to release")
                    .required(true),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::Channel,
                "channel",
                "Only release the channel-specific record",
            ))
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let Some(guild_id) = ctx.guild_id() else {
            return ctx.respond_text(GUILD_ONLY, true).await;
        };
        let user_id = ctx
            .user_option("user")
            .ok_or_else(|| BotError::Command("Missing required option: user".to_string()))?;
        let channel_id = ctx.channel_option("channel");

        let removed =
            SlowUserRepository::remove(ctx.state.db.pool(), guild_id, user_id, channel_id).await?;

        let content = if removed {
            format!("✅ <@{user_id}> is no longer on slow mode.")
        } else {
            format!("<@{user_id}> has no matching slow mode record.")
        };
        ctx.respond_text(content, true).await
    }
}
