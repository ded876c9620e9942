//! Discord command bot: dispatch pipeline, command roster, and the
//! service glue behind them.

pub mod commands;
pub mod context;
pub mod discord;
pub mod dispatch;
pub mod error;
pub mod error_log;
pub mod gate;
pub mod services;
pub mod state;

pub use error::BotError;
