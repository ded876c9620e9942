//! Point someone at the "don't ask to ask" etiquette page.

use async_trait::async_trait;
use serenity::model::channel::Message;

use crate::commands::{MessageCommand, MessageContext};
use crate::error::BotError;

const LINK: &str = "https://dontasktoask.com";

pub struct QuestionCommand;

#[async_trait]
impl MessageCommand for QuestionCommand {
    fn name(&self) -> &str {
        "question"
    }

    fn matches(&self, msg: &Message) -> bool {
        msg.content.trim().to_lowercase() == "question"
    }

    async fn run(&self, ctx: &MessageContext<'_>) -> Result<(), BotError> {
        // Aim the link at the asker when this was a reply.
        if let Some(parent) = ctx.reply_parent() {
            parent.reply(&ctx.serenity.http, LINK).await?;
            return Ok(());
        }
        ctx.msg.channel_id.say(&ctx.serenity.http, LINK).await?;
        Ok(())
    }
}
