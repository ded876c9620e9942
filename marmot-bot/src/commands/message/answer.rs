//! Answer the replied-to message using the conversation as context.
//!
//! Two variants share one implementation and the `llm` cooldown: a
//! helpful long-form answer and a deliberately blunt short one.

use std::sync::Arc;

use async_trait::async_trait;
use marmot_core::CooldownRegistry;
use serenity::model::channel::Message;

use super::llm_guild_gate;
use crate::commands::{MessageCommand, MessageContext};
use crate::context::render_labeled;
use crate::dispatch::{EMOJI_CONFUSED, react};
use crate::error::BotError;

const HELPFUL_PROMPT: &str =
    "You are a helpful assistant. Provide a clear answer using the conversation context.";
const DEFINITIVE_PROMPT: &str =
    "You are a concise assistant. Provide a short, specific answer without nuance.";

pub(crate) fn trigger_matches(trigger: &str, content: &str) -> bool {
    content.trim().to_lowercase() == trigger
}

pub struct AnswerCommand {
    name: &'static str,
    trigger: &'static str,
    system_prompt: &'static str,
    cooldown: Arc<CooldownRegistry>,
}

impl AnswerCommand {
    pub fn helpful(cooldown: Arc<CooldownRegistry>) -> Self {
        Self {
            name: "answer",
            trigger: "answer",
            system_prompt: HELPFUL_PROMPT,
            cooldown,
        }
    }

    pub fn definitive(cooldown: Arc<CooldownRegistry>) -> Self {
        Self {
            name: "answer_definitive",
            trigger: "answer definitive",
            system_prompt: DEFINITIVE_PROMPT,
            cooldown,
        }
    }
}

#[async_trait]
impl MessageCommand for AnswerCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn cooldown(&self) -> Option<&Arc<CooldownRegistry>> {
        Some(&self.cooldown)
    }

    fn requires_reply(&self) -> bool {
        true
    }

    fn matches(&self, msg: &Message) -> bool {
        trigger_matches(self.trigger, &msg.content)
    }

    async fn run(&self, ctx: &MessageContext<'_>) -> Result<(), BotError> {
        let Some(target) = ctx.reply_parent() else {
            react(ctx.serenity, ctx.msg, EMOJI_CONFUSED).await;
            return Ok(());
        };
        if llm_guild_gate(ctx).await?.is_none() {
            react(ctx.serenity, ctx.msg, EMOJI_CONFUSED).await;
            return Ok(());
        }

        let question = if target.content.trim().is_empty() {
            "(no text)"
        } else {
            target.content.trim()
        };
        let user_prompt = [
            format!("Question: {question}"),
            render_labeled(&ctx.convo.previous_messages, "Recent messages"),
            render_labeled(&ctx.convo.reply_chain, "Reply chain"),
        ]
        .join("\n\n");

        let response = ctx.state.llm.complete(self.system_prompt, &user_prompt).await?;
        target.reply(&ctx.serenity.http, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_matching_is_exact_after_normalization() {
        assert!(trigger_matches("answer", "  Answer "));
        assert!(trigger_matches("answer definitive", "ANSWER DEFINITIVE"));
        assert!(!trigger_matches("answer", "answer definitive"));
        assert!(!trigger_matches("answer", "answer please"));
    }
}
