//! marmot-db: SQLite storage for the marmot bot.
//!
//! This crate provides database operations for:
//! - Per-user slow-mode records (guild-wide or per-channel)
//! - Scheduled reminders
//! - AI feature bans
//! - Persisted cooldown overrides
//! - Command usage telemetry

pub mod ai_bans;
pub mod bot_db;
pub mod command_usage;
pub mod cooldown_overrides;
pub mod error;
mod ids;
pub mod reminders;
pub mod slow_users;
mod sqlite_runtime;

// Re-export commonly used types
pub use ai_bans::AiBanRepository;
pub use bot_db::BotDb;
pub use command_usage::{
    CommandKind, CommandUsageCount, CommandUsageRepository, UsageEvent, UserUsageCount,
};
pub use cooldown_overrides::{CooldownOverrideRepository, StoredCooldownOverride};
pub use error::{DbError, DbResult};
pub use reminders::{NewReminder, Reminder, ReminderRepository};
pub use slow_users::{SlowUser, SlowUserRepository};

// Re-export test helpers when running tests or when test-helpers feature is enabled
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
