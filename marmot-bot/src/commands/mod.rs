//! Command traits and invocation contexts.
//!
//! Two command families share the dispatch machinery: slash commands
//! registered with Discord, and message commands matched against plain
//! chat text. Both are trait objects held by the registry; the
//! dispatcher owns every cross-cutting concern (auth, cooldowns,
//! telemetry, failure handling) so command bodies stay domain-only.

use std::sync::Arc;

use async_trait::async_trait;
use marmot_core::CooldownRegistry;
use serenity::builder::{
    CreateCommand, CreateEmbed, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage,
};
use serenity::model::application::{CommandInteraction, ResolvedValue};
use serenity::model::channel::Message;
use serenity::prelude::Context;

use crate::context::ConversationContext;
use crate::error::BotError;
use crate::state::AppState;

pub mod message;
pub mod slash;

/// Build the full command roster against the shared state.
pub fn build_registry(state: &Arc<AppState>) -> crate::dispatch::CommandRegistry {
    let moderators = state.config.moderator_role_ids.clone();
    let registry_names = state.cooldowns.list_names();
    let llm_cooldown = &state.llm_cooldown;

    let mut registry = crate::dispatch::CommandRegistry::new();

    registry.register_slash(Arc::new(slash::SlowUserCommand::new(moderators.clone())));
    registry.register_slash(Arc::new(slash::UnslowUserCommand::new(moderators.clone())));
    registry.register_slash(Arc::new(slash::AiBanCommand::new(moderators.clone())));
    registry.register_slash(Arc::new(slash::AiUnbanCommand::new(moderators.clone())));
    registry.register_slash(Arc::new(slash::LogCommand::new(moderators.clone())));
    registry.register_slash(Arc::new(slash::CooldownSetCommand::new(
        moderators.clone(),
        registry_names.clone(),
    )));
    registry.register_slash(Arc::new(slash::CooldownClearCommand::new(
        moderators.clone(),
        registry_names,
    )));
    registry.register_slash(Arc::new(slash::ReplyCommand::new(moderators.clone())));
    registry.register_slash(Arc::new(slash::ModHelpCommand::new(moderators)));
    registry.register_slash(Arc::new(slash::StatsCommand));
    registry.register_slash(Arc::new(slash::HelpCommand));
    registry.register_slash(Arc::new(slash::NewsCommand));

    registry.register_message(Arc::new(message::AnswerCommand::definitive(Arc::clone(
        llm_cooldown,
    ))));
    registry.register_message(Arc::new(message::AnswerCommand::helpful(Arc::clone(
        llm_cooldown,
    ))));
    registry.register_message(Arc::new(message::AcronymCommand::new(Arc::clone(
        llm_cooldown,
    ))));
    registry.register_message(Arc::new(message::ContextCommand::new(Arc::clone(
        llm_cooldown,
    ))));
    registry.register_message(Arc::new(message::QuestionCommand));
    registry.register_message(Arc::new(message::WikiCommand));
    registry.register_message(Arc::new(message::RemindCommand));

    registry
}

/// A slash command the bot registers with Discord.
#[async_trait]
pub trait SlashCommand: Send + Sync {
    fn name(&self) -> &str;

    /// Role ids allowed to invoke; empty means unrestricted.
    fn allowed_role_ids(&self) -> &[u64] {
        &[]
    }

    /// Cooldown registry this command charges, if any.
    fn cooldown(&self) -> Option<&Arc<CooldownRegistry>> {
        None
    }

    /// Registration payload sent to Discord.
    fn register(&self) -> CreateCommand;

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError>;
}

/// A command triggered by matching plain chat messages.
#[async_trait]
pub trait MessageCommand: Send + Sync {
    fn name(&self) -> &str;

    fn allowed_role_ids(&self) -> &[u64] {
        &[]
    }

    fn cooldown(&self) -> Option<&Arc<CooldownRegistry>> {
        None
    }

    /// Whether the trigger must be a reply to another message.
    fn requires_reply(&self) -> bool {
        false
    }

    /// Whether this message triggers the command. Matching must be
    /// cheap and side-effect free; the first matching command wins.
    fn matches(&self, msg: &Message) -> bool;

    async fn run(&self, ctx: &MessageContext<'_>) -> Result<(), BotError>;
}

/// Everything a slash command sees while running.
pub struct SlashContext<'a> {
    pub serenity: &'a Context,
    pub interaction: &'a CommandInteraction,
    pub state: &'a Arc<AppState>,
    /// Whether the dispatcher already sent the initial response, which
    /// forces every later send through the followup endpoint.
    acked: bool,
}

impl<'a> SlashContext<'a> {
    pub fn new(
        serenity: &'a Context,
        interaction: &'a CommandInteraction,
        state: &'a Arc<AppState>,
        acked: bool,
    ) -> Self {
        Self {
            serenity,
            interaction,
            state,
            acked,
        }
    }

    pub fn user_id(&self) -> u64 {
        self.interaction.user.id.get()
    }

    pub fn guild_id(&self) -> Option<u64> {
        self.interaction.guild_id.map(|id| id.get())
    }

    /// Send a text response, as the initial response or a followup
    /// depending on whether the interaction was already acknowledged.
    pub async fn respond_text(
        &self,
        content: impl Into<String>,
        ephemeral: bool,
    ) -> Result<(), BotError> {
        self.respond(content.into(), Vec::new(), ephemeral).await
    }

    pub async fn respond_embeds(
        &self,
        content: impl Into<String>,
        embeds: Vec<CreateEmbed>,
        ephemeral: bool,
    ) -> Result<(), BotError> {
        self.respond(content.into(), embeds, ephemeral).await
    }

    async fn respond(
        &self,
        content: String,
        embeds: Vec<CreateEmbed>,
        ephemeral: bool,
    ) -> Result<(), BotError> {
        if self.acked {
            let mut followup = CreateInteractionResponseFollowup::new()
                .embeds(embeds)
                .ephemeral(ephemeral);
            if !content.is_empty() {
                followup = followup.content(content);
            }
            self.interaction
                .create_followup(&self.serenity.http, followup)
                .await?;
        } else {
            let mut message = CreateInteractionResponseMessage::new()
                .embeds(embeds)
                .ephemeral(ephemeral);
            if !content.is_empty() {
                message = message.content(content);
            }
            self.interaction
                .create_response(
                    &self.serenity.http,
                    CreateInteractionResponse::Message(message),
                )
                .await?;
        }
        Ok(())
    }

    fn resolved(&self, name: &str) -> Option<ResolvedValue<'_>> {
        self.interaction
            .data
            .options()
            .into_iter()
            .find(|option| option.name == name)
            .map(|option| option.value)
    }

    pub fn str_option(&self, name: &str) -> Option<String> {
        match self.resolved(name)? {
            ResolvedValue::String(value) => Some(value.to_string()),
            _ => None,
        }
    }

    pub fn int_option(&self, name: &str) -> Option<i64> {
        match self.resolved(name)? {
            ResolvedValue::Integer(value) => Some(value),
            _ => None,
        }
    }

    pub fn bool_option(&self, name: &str) -> Option<bool> {
        match self.resolved(name)? {
            ResolvedValue::Boolean(value) => Some(value),
            _ => None,
        }
    }

    pub fn user_option(&self, name: &str) -> Option<u64> {
        match self.resolved(name)? {
            ResolvedValue::User(user, _) => Some(user.id.get()),
            _ => None,
        }
    }

    pub fn channel_option(&self, name: &str) -> Option<u64> {
        match self.resolved(name)? {
            ResolvedValue::Channel(channel) => Some(channel.id.get()),
            _ => None,
        }
    }
}

/// Everything a message command sees while running.
pub struct MessageContext<'a> {
    pub serenity: &'a Context,
    pub msg: &'a Message,
    pub convo: ConversationContext,
    pub state: &'a Arc<AppState>,
}

impl MessageContext<'_> {
    pub fn user_id(&self) -> u64 {
        self.msg.author.id.get()
    }

    pub fn guild_id(&self) -> Option<u64> {
        self.msg.guild_id.map(|id| id.get())
    }

    /// The message this trigger replied to, when it is one.
    pub fn reply_parent(&self) -> Option<&Message> {
        self.convo.reply_chain.first()
    }
}
