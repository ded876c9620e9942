//! Message command implementations.

use crate::commands::MessageContext;
use crate::error::BotError;
use marmot_db::AiBanRepository;

mod acronym;
mod answer;
mod context;
mod question;
mod remind;
mod wiki;

pub use acronym::AcronymCommand;
pub use answer::AnswerCommand;
pub use context::ContextCommand;
pub use question::QuestionCommand;
pub use remind::RemindCommand;
pub use wiki::WikiCommand;

/// LLM-backed message commands only run in guilds (bans are per-guild)
/// and only for unbanned users. Returns the guild id to use, `None`
/// when the invocation should be answered with a confused react.
pub(crate) async fn llm_guild_gate(ctx: &MessageContext<'_>) -> Result<Option<u64>, BotError> {
    if !ctx.state.llm.is_configured() {
        return Err(BotError::Message("LLM is not configured.".to_string()));
    }
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(None);
    };
    if AiBanRepository::is_banned(ctx.state.db.pool(), guild_id, ctx.user_id()).await? {
        return Err(BotError::Message(
            "User is blocked from LLM usage.".to_string(),
        ));
    }
    Ok(Some(guild_id))
}
