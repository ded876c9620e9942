//! Moderator controls for blocking users from LLM-backed commands.

use async_trait::async_trait;
use marmot_db::AiBanRepository;
use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::model::application::CommandOptionType;

use super::GUILD_ONLY;
use crate::commands::{SlashCommand, SlashContext};
use crate::error::BotError;

pub struct AiBanCommand {
    moderator_role_ids: Vec<u64>,
}

impl AiBanCommand {
    pub fn new(moderator_role_ids: Vec<u64>) -> Self {
        Self { moderator_role_ids }
    }
}

#[async_trait]
impl SlashCommand for AiBanCommand {
    fn name(&self) -> &str {
        "aiban"
    }

    fn allowed_role_ids(&self) -> &[u64] {
        &self.moderator_role_ids
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name())
            .description("Block a user from LLM-backed commands.")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "User to block")
                    .required(true),
            )
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let Some(guild_id) = ctx.guild_id() else {
            return ctx.respond_text(GUILD_ONLY, true).await;
        };
        let user_id = ctx
            .user_option("user")
            .ok_or_else(|| BotError::Command("Missing required option: user".to_string()))?;

        let banned = AiBanRepository::ban(ctx.state.db.pool(), guild_id, user_id).await?;
        let content = if banned {
            format!("✅ <@{user_id}> is now blocked from LLM commands.")
        } else {
            format!("<@{user_id}> is already blocked.")
        };
        ctx.respond_text(content, true).await
    }
}

pub struct AiUnbanCommand {
    moderator_role_ids: Vec<u64>,
}

impl AiUnbanCommand {
    pub fn new(moderator_role_ids: Vec<u64>) -> Self {
        Self { moderator_role_ids }
    }
}

#[async_trait]
impl SlashCommand for AiUnbanCommand {
    fn name(&self) -> &str {
        "aiunban"
    }

    fn allowed_role_ids(&self) -> &[u64] {
        &self.moderator_role_ids
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name())
            .description("Unblock a user from LLM-backed commands.")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "User to unblock")
                    .required(true),
            )
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let Some(guild_id) = ctx.guild_id() else {
            return ctx.respond_text(GUILD_ONLY, true).await;
        };
        let user_id = ctx
            .user_option("user")
            .ok_or_else(|| BotError::Command("Missing required option: user".to_string()))?;

        let removed = AiBanRepository::unban(ctx.state.db.pool(), guild_id, user_id).await?;
        let content = if removed {
            format!("✅ <@{user_id}> can use LLM commands again.")
        } else {
            format!("<@{user_id}> was not blocked.")
        };
        ctx.respond_text(content, true).await
    }
}
