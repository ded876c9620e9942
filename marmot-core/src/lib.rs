//! marmot-core: configuration and rate-limiting primitives for the marmot bot.
//!
//! This crate is platform-agnostic: it knows nothing about Discord or the
//! database engine. It provides:
//! - Environment-driven configuration with fatal startup validation
//! - Named per-user cooldown registries with persisted-override support
//! - Error normalization for consistent failure logging

pub mod config;
pub mod cooldown;
pub mod error;

pub use config::{Config, ConfigError};
pub use cooldown::{
    CooldownDirectory, CooldownDirectoryError, CooldownOverride, CooldownRegistry,
};
pub use error::NormalizedError;
