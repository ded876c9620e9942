//! Web-searched background for the replied-to message.

use std::sync::Arc;

use async_trait::async_trait;
use marmot_core::CooldownRegistry;
use marmot_db::AiBanRepository;
use serenity::model::channel::Message;

use crate::commands::{MessageCommand, MessageContext};
use crate::dispatch::{EMOJI_CONFUSED, react};
use crate::error::BotError;

pub struct ContextCommand {
    cooldown: Arc<CooldownRegistry>,
}

impl ContextCommand {
    pub fn new(cooldown: Arc<CooldownRegistry>) -> Self {
        Self { cooldown }
    }
}

#[async_trait]
impl MessageCommand for ContextCommand {
    fn name(&self) -> &str {
        "context"
    }

    fn cooldown(&self) -> Option<&Arc<CooldownRegistry>> {
        Some(&self.cooldown)
    }

    fn requires_reply(&self) -> bool {
        true
    }

    fn matches(&self, msg: &Message) -> bool {
        msg.content.trim().to_lowercase() == "context"
    }

    async fn run(&self, ctx: &MessageContext<'_>) -> Result<(), BotError> {
        let target = match ctx.reply_parent() {
            Some(target) if !target.content.trim().is_empty() => target,
            _ => {
                react(ctx.serenity, ctx.msg, EMOJI_CONFUSED).await;
                return Ok(());
            }
        };

        if !ctx.state.live_search.is_configured() {
            return Err(BotError::Message(
                "Live search is not configured.".to_string(),
            ));
        }
        let Some(guild_id) = ctx.guild_id() else {
            react(ctx.serenity, ctx.msg, EMOJI_CONFUSED).await;
            return Ok(());
        };
        if AiBanRepository::is_banned(ctx.state.db.pool(), guild_id, ctx.user_id()).await? {
            return Err(BotError::Message(
                "User is blocked from LLM usage.".to_string(),
            ));
        }

        let response = ctx.state.live_search.fetch_context(&target.content).await?;
        target.reply(&ctx.serenity.http, response).await?;
        Ok(())
    }
}
