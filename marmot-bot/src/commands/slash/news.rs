//! BBC headlines, plain or ranked against a query.

use async_trait::async_trait;
use marmot_db::AiBanRepository;
use serenity::builder::{CreateCommand, CreateCommandOption, CreateEmbed};
use serenity::model::application::CommandOptionType;

use crate::commands::{SlashCommand, SlashContext};
use crate::error::BotError;
use crate::services::NewsItem;

const MAX_ITEMS: usize = 10;
const NEWS_COLOR: u32 = 0x1d7aa2;
const DEFAULT_CATEGORY: &str = "US & Canada news";
const SUMMARY_LIMIT: usize = 900;

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max - 1).collect();
    format!("{}…", cut.trim_end())
}

fn item_embed(item: &NewsItem) -> CreateEmbed {
    let mut embed = CreateEmbed::new().title(&item.title).colour(NEWS_COLOR);
    if let Some(link) = &item.link {
        embed = embed.url(link);
    }
    embed = embed.description(match &item.summary {
        Some(summary) => truncate(summary, SUMMARY_LIMIT),
        None => "No summary available.".to_string(),
    });
    if let Some(image) = &item.image {
        embed = embed.image(image);
    }
    embed
}

pub struct NewsCommand;

#[async_trait]
impl SlashCommand for NewsCommand {
    fn name(&self) -> &str {
        "news"
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name())
            .description("Show current BBC headlines.")
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "Search query to rank headlines",
            ))
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let query = ctx
            .str_option("query")
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());

        if let Some(query) = query {
            if !ctx.state.llm.is_configured() {
                return ctx
                    .respond_text("LLM is not configured. Try /news without a query.", true)
                    .await;
            }
            if let Some(guild_id) = ctx.guild_id() {
                if AiBanRepository::is_banned(ctx.state.db.pool(), guild_id, ctx.user_id()).await? {
                    return ctx
                        .respond_text("You are blocked from LLM commands.", true)
                        .await;
                }
            }

            let scored = ctx.state.news.search(&query, &ctx.state.llm).await?;
            if scored.is_empty() {
                return ctx.respond_text("No matching news items found.", true).await;
            }

            let embeds: Vec<CreateEmbed> = scored
                .iter()
                .take(MAX_ITEMS)
                .map(|scored| item_embed(&scored.item))
                .collect();
            return ctx
                .respond_embeds(format!("Top news matches for \"{query}\":"), embeds, false)
                .await;
        }

        let items = ctx.state.news.get_category(DEFAULT_CATEGORY).await?;
        if items.is_empty() {
            return ctx
                .respond_text("No US & Canada news found right now.", true)
                .await;
        }

        let embeds: Vec<CreateEmbed> = items.iter().take(MAX_ITEMS).map(item_embed).collect();
        ctx.respond_embeds(format!("{DEFAULT_CATEGORY}:"), embeds, false)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_preserves_short_text() {
        assert_eq!(truncate("short", 900), "short");
    }

    #[test]
    fn test_truncate_trims_and_appends_ellipsis() {
        let long = "a".repeat(1_000);
        let result = truncate(&long, 900);
        assert_eq!(result.chars().count(), 900);
        assert!(result.ends_with('…'));
    }
}
