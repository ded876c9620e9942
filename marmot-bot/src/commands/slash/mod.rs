//! Slash command implementations.

mod ai_ban;
mod cooldown;
mod help;
mod log;
mod news;
mod reply;
mod slow_user;
mod stats;

pub use ai_ban::{AiBanCommand, AiUnbanCommand};
pub use cooldown::{CooldownClearCommand, CooldownSetCommand};
pub use help::{HelpCommand, ModHelpCommand};
pub use log::LogCommand;
pub use news::NewsCommand;
pub use reply::ReplyCommand;
pub use slow_user::{SlowUserCommand, UnslowUserCommand};
pub use stats::StatsCommand;

const GUILD_ONLY: &str = "This command only works in a server.";
