//! Static help texts.

use async_trait::async_trait;
use serenity::builder::{CreateCommand, CreateEmbed};

use crate::commands::{SlashCommand, SlashContext};
use crate::error::BotError;

const HELP_COLOR: u32 = 0x4c6ef5;

const HELP_TEXT: &str = "\
**Message commands** (type them in chat)
- `answer` — reply to a message with this to get an answer using the conversation
- `answer definitive` — same, but short and to the point
- `acronym` — reply to a message to expand its acronyms
- `context` — reply to a message to get web-searched background
- `question` — nudge someone to just ask their question
- `wiki <query>` — look something up on Wikipedia
- `remind me <when>` — e.g. `remind me in 2 hours`

**Slash commands**
- `/news [query]` — current headlines, optionally ranked by your query
- `/stats` — bot uptime and usage
- `/help` — this message";

const MODHELP_TEXT: &str = "\
**Moderation commands**
- `/slowuser` / `/unslowuser` — per-user message rate limits
- `/aiban` / `/aiunban` — block a user from LLM commands
- `/cooldownset` / `/cooldownclear` — per-user cooldown overrides
- `/reply` — send a message as the bot
- `/log [page]` — recent command failures

React ⏰ on a cooldown-blocked command message (within 10 minutes) to \
run it anyway.";

pub struct HelpCommand;

#[async_trait]
impl SlashCommand for HelpCommand {
    fn name(&self) -> &str {
        "help"
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name()).description("Show what the bot can do.")
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let embed = CreateEmbed::new()
            .title("Marmot")
            .colour(HELP_COLOR)
            .description(HELP_TEXT);
        ctx.respond_embeds("", vec![embed], true).await
    }
}

pub struct ModHelpCommand {
    moderator_role_ids: Vec<u64>,
}

impl ModHelpCommand {
    pub fn new(moderator_role_ids: Vec<u64>) -> Self {
        Self { moderator_role_ids }
    }
}

#[async_trait]
impl SlashCommand for ModHelpCommand {
    fn name(&self) -> &str {
        "modhelp"
    }

    fn allowed_role_ids(&self) -> &[u64] {
        &self.moderator_role_ids
    }

    fn register(&self) -> CreateCommand {
        CreateCommand::new(self.name()).description("Show the moderation commands.")
    }

    async fn run(&self, ctx: &SlashContext<'_>) -> Result<(), BotError> {
        let embed = CreateEmbed::new()
            .title("Marmot moderation")
            .colour(HELP_COLOR)
            .description(MODHELP_TEXT);
        ctx.respond_embeds("", vec![embed], true).await
    }
}
