//! Moderator view of recent command failures.

use async_trait::async_trait;
use serenity::builder::{CreateCommand, CreateCommandOption, CreateEmbed, CreateEmbedFooter};
use serenity::model::application::CommandOptionType;

use crate::commands::{SlashCommand, SlashContext};
use crate::error::BotError;
use crate::error_log::ErrorLogEntry;

const PAGE_SIZE: usize = 10;
const ERROR_COLOR: u32 = 0xcc3b3b;

fn entry_embed(entry: &ErrorLogEntry, page: usize, total_pages: usize, total: usize) -> CreateEmbed {
    let underlying = match &entry.error.cause {
        Some(cause) => cause.message.clone(),
        None => "None".to_string(),
    };
    let invocation = match (entry.guild_id, entry.channel_id, entry.message_id) {
        (Some(guild), Some(channel), Some(message)) => format!(
            "[Jump](https://discord.com/channels/{guild}/{channel}/{message})"
        ),
        _ => "N/A".to_string(),
    };

    CreateEmbed::new()
        .title(format!("{}: {}", entry.error.kind, entry.error.message))
        .colour(ERROR_COLOR)
        .field(
            "Command",
            format!("{}:{}", entry.command_kind, entry.command_name),
            false,
        )
        .field("Underlying error", underlying, false)
        .field("Invoker", format!("<@{}>", entry.user_id), false)
        .field("Invocation", invocation, false)
        .field("When", entry.at.format("%Y-%m-%d %H:%M:%S UTC").to_string(), false)
        .footer(CreateEmbedFooter::new(format!(
            "Page {page}/{total_pages} • {total} total"
        )))
}

pub struct LogCommand {
    moderator_role_ids: Vec<u64>,
}

impl LogCommand {
    pub fn new(moderator_role_ids: Vec<u64>) -> Self {
        Self { moderator_role_ids }
    }
}

#[async_trait]
impl SlashCommand for LogCommand {
    fn name(&self) -> &str {
        "log"
    }

    fn allowed_role_ids(&self) -> &[u64] {
        &self.moderator_role_ids
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name())
            .description("Show recent command failures.")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    "page",
                    "Page of failures to show (10 per page)",
                )
                .min_int_value(1),
            )
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let requested = ctx.int_option("page").unwrap_or(1).max(1) as usize;
        let page = ctx.state.error_log.page(requested, PAGE_SIZE);

        if page.entries.is_empty() {
            return ctx.respond_text("No recent failures.", true).await;
        }

        let embeds: Vec<CreateEmbed> = page
            .entries
            .iter()
            .map(|entry| entry_embed(entry, page.page, page.total_pages, page.total))
            .collect();
        ctx.respond_embeds("", embeds, true).await
    }
}
