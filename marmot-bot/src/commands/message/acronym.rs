//! Expand the acronyms in the replied-to message.

use std::sync::Arc;

use async_trait::async_trait;
use marmot_core::CooldownRegistry;
use serenity::model::channel::Message;

use super::llm_guild_gate;
use crate::commands::{MessageCommand, MessageContext};
use crate::dispatch::{EMOJI_CONFUSED, react};
use crate::error::BotError;

const SYSTEM_PROMPT: &str = "You extract acronyms and return only their fully expanded terms. \
Respond with only the expanded terms, one per line. Do not include acronyms, punctuation, or \
any other words.";

/// Model answers that mean "nothing to expand".
fn is_empty_answer(response: &str) -> bool {
    let normalized = response.trim().to_lowercase();
    normalized.is_empty()
        || normalized == "none"
        || normalized == "n/a"
        || normalized == "no acronyms"
        || normalized == "no acronyms found"
}

pub struct AcronymCommand {
    cooldown: Arc<CooldownRegistry>,
}

impl AcronymCommand {
    pub fn new(cooldown: Arc<CooldownRegistry>) -> Self {
        Self { cooldown }
    }
}

#[async_trait]
impl MessageCommand for AcronymCommand {
    fn name(&self) -> &str {
        "acronym"
    }

    fn cooldown(&self) -> Option<&Arc<CooldownRegistry>> {
        Some(&self.cooldown)
    }

    fn requires_reply(&self) -> bool {
        true
    }

    fn matches(&self, msg: &Message) -> bool {
        msg.content.trim().to_lowercase() == "acronym"
    }

    async fn run(&self, ctx: &MessageContext<'_>) -> Result<(), BotError> {
        let target = match ctx.reply_parent() {
            Some(target) if !target.content.trim().is_empty() => target,
            _ => {
                react(ctx.serenity, ctx.msg, EMOJI_CONFUSED).await;
                return Ok(());
            }
        };
        if llm_guild_gate(ctx).await?.is_none() {
            react(ctx.serenity, ctx.msg, EMOJI_CONFUSED).await;
            return Ok(());
        }

        let response = ctx.state.llm.complete(SYSTEM_PROMPT, &target.content).await?;
        if is_empty_answer(&response) {
            react(ctx.serenity, ctx.msg, EMOJI_CONFUSED).await;
            return Ok(());
        }

        ctx.msg.reply(&ctx.serenity.http, response.trim()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_answers_are_recognized() {
        assert!(is_empty_answer("  "));
        assert!(is_empty_answer("None"));
        assert!(is_empty_answer("N/A"));
        assert!(is_empty_answer("no acronyms found"));
        assert!(!is_empty_answer("North Atlantic Treaty Organization"));
    }
}
