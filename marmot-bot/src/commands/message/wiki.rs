//! Encyclopedia lookup: `wiki <query>`.

use async_trait::async_trait;
use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::model::channel::Message;

use crate::commands::{MessageCommand, MessageContext};
use crate::dispatch::{EMOJI_CONFUSED, react};
use crate::error::BotError;

fn extract_query(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    let lowered = trimmed.to_lowercase();
    if lowered == "wiki" {
        return None;
    }
    if !lowered.starts_with("wiki ") {
        return None;
    }
    let query = trimmed["wiki ".len()..].trim();
    (!query.is_empty()).then_some(query)
}

pub struct WikiCommand;

#[async_trait]
impl MessageCommand for WikiCommand {
    fn name(&self) -> &str {
        "wiki"
    }

    fn matches(&self, msg: &Message) -> bool {
        let content = msg.content.trim().to_lowercase();
        content == "wiki" || content.starts_with("wiki ")
    }

    async fn run(&self, ctx: &MessageContext<'_>) -> Result<(), BotError> {
        let Some(query) = extract_query(&ctx.msg.content) else {
            react(ctx.serenity, ctx.msg, EMOJI_CONFUSED).await;
            return Ok(());
        };

        let Some(result) = ctx.state.wikipedia.search_top_result(query).await? else {
            ctx.msg.reply(&ctx.serenity.http, "No results found.").await?;
            return Ok(());
        };

        let mut embed = CreateEmbed::new()
            .title(&result.title)
            .url(&result.url)
            .description(
                result
                    .summary
                    .as_deref()
                    .unwrap_or("No summary available."),
            );
        if let Some(thumbnail) = &result.thumbnail_url {
            embed = embed.thumbnail(thumbnail);
        }

        ctx.msg
            .channel_id
            .send_message(
                &ctx.serenity.http,
                CreateMessage::new().embed(embed).reference_message(ctx.msg),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_query() {
        assert_eq!(extract_query("wiki Rust"), Some("Rust"));
        assert_eq!(extract_query("  Wiki  marmots  "), Some("marmots"));
        assert_eq!(extract_query("wiki"), None);
        assert_eq!(extract_query("wiki   "), None);
        assert_eq!(extract_query("wikipedia"), None);
    }
}
