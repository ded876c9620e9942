//! Moderator controls for per-user cooldown overrides.
//!
//! Overrides are written to the database first, then applied to the
//! in-memory registry, so a restart rehydrates the same state.

use async_trait::async_trait;
use marmot_db::CooldownOverrideRepository;
use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::model::application::CommandOptionType;

use crate::commands::{SlashCommand, SlashContext};
use crate::error::BotError;

fn registry_option(registry_names: &[String]) -> CreateCommandOption {
    let mut option = CreateCommandOption::new(
        CommandOptionType::String,
        "registry",
        "Cooldown registry to adjust",
    )
    .required(true);
    for name in registry_names {
        option = option.add_string_choice(name, name);
    }
    option
}

pub struct CooldownSetCommand {
    moderator_role_ids: Vec<u64>,
    registry_names: Vec<String>,
}

impl CooldownSetCommand {
    pub fn new(moderator_role_ids: Vec<u64>, registry_names: Vec<String>) -> Self {
        Self {
            moderator_role_ids,
            registry_names,
        }
    }
}

#[async_trait]
impl SlashCommand for CooldownSetCommand {
    fn name(&self) -> &str {
        "cooldownset"
    }

    fn allowed_role_ids(&self) -> &[u64] {
        &self.moderator_role_ids
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name())
            .description("Override a user's cooldown.")
            .add_option(registry_option(&self.registry_names))
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "User to adjust")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    "seconds",
                    "New cooldown in seconds (0 disables it)",
                )
                .min_int_value(0)
                .required(true),
            )
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let name = ctx
            .str_option("registry")
            .ok_or_else(|| BotError::Command("Missing required option: registry".to_string()))?;
        let user_id = ctx
            .user_option("user")
            .ok_or_else(|| BotError::Command("Missing required option: user".to_string()))?;
        let seconds = ctx
            .int_option("seconds")
            .ok_or_else(|| BotError::Command("Missing required option: seconds".to_string()))?
            .max(0);

        let Some(registry) = ctx.state.cooldowns.get(&name) else {
            return ctx.respond_text("Unknown cooldown registry.", true).await;
        };
        let guild_id = ctx.guild_id();

        CooldownOverrideRepository::set(
            ctx.state.db.pool(),
            guild_id,
            user_id,
            registry.name(),
            seconds,
        )
        .await?;
        registry.set_user_cooldown(user_id, seconds as u64, guild_id);

        let content = if seconds == 0 {
            format!(
                "✅ '{}' cooldown disabled for <@{user_id}>.",
                registry.name()
            )
        } else {
            format!(
                "✅ '{}' cooldown for <@{user_id}> set to {seconds}s.",
                registry.name()
            )
        };
        ctx.respond_text(content, true).await
    }
}

pub struct CooldownClearCommand {
    moderator_role_ids: Vec<u64>,
    registry_names: Vec<String>,
}

impl CooldownClearCommand {
    pub fn new(moderator_role_ids: Vec<u64>, registry_names: Vec<String>) -> Self {
        Self {
            moderator_role_ids,
            registry_names,
        }
    }
}

#[async_trait]
impl SlashCommand for CooldownClearCommand {
    fn name(&self) -> &str {
        "cooldownclear"
    }

    fn allowed_role_ids(&self) -> &[u64] {
        &self.moderator_role_ids
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name())
            .description("Remove a user's cooldown override.")
            .add_option(registry_option(&self.registry_names))
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "User to reset")
                    .required(true),
            )
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let name = ctx
            .str_option("registry")
            .ok_or_else(|| BotError::Command("Missing required option: registry".to_string()))?;
        let user_id = ctx
            .user_option("user")
            .ok_or_else(|| BotError::Command("Missing required option: user".to_string()))?;

        let Some(registry) = ctx.state.cooldowns.get(&name) else {
            return ctx.respond_text("Unknown cooldown registry.", true).await;
        };
        let guild_id = ctx.guild_id();

        let existed =
            CooldownOverrideRepository::clear(ctx.state.db.pool(), guild_id, user_id, registry.name())
                .await?;
        registry.clear_user_cooldown(user_id, guild_id);

        let content = if existed {
            format!(
                "✅ Override cleared; <@{user_id}> is back on the '{}' default ({}s).",
                registry.name(),
                registry.default_cooldown_secs()
            )
        } else {
            format!("<@{user_id}> has no '{}' override.", registry.name())
        };
        ctx.respond_text(content, true).await
    }
}
