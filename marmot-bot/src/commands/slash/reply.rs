//! Moderator relay: send a message as the bot.

use async_trait::async_trait;
use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::model::application::CommandOptionType;
use serenity::model::id::ChannelId;

use crate::commands::{SlashCommand, SlashContext};
use crate::error::BotError;

pub struct ReplyCommand {
    moderator_role_ids: Vec<u64>,
}

impl ReplyCommand {
    pub fn new(moderator_role_ids: Vec<u64>) -> Self {
        Self { moderator_role_ids }
    }
}

#[async_trait]
impl SlashCommand for ReplyCommand {
    fn name(&self) -> &str {
        "reply"
    }

    fn allowed_role_ids(&self) -> &[u64] {
        &self.moderator_role_ids
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name())
            .description("Send a message as the bot.")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "channel",
                    "Channel to send into",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "message", "What to say")
                    .required(true),
            )
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let channel_id = ctx
            .channel_option("channel")
            .ok_or_else(|| BotError::Command("Missing required option: channel".to_string()))?;
        let message = ctx
            .str_option("message")
            .ok_or_else(|| BotError::Command("Missing required option: message".to_string()))?;

        ChannelId::new(channel_id)
            .say(&ctx.serenity.http, message)
            .await?;
        ctx.respond_text(format!("✅ Sent to <#{channel_id}>."), true)
            .await
    }
}
