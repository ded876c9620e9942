//! Configuration loaded from environment variables only.
//!
//! Secrets (tokens, API keys) are never written to disk. A `.env` file is
//! honored for development convenience; production should rely on actual
//! environment variables.

use std::env;

/// Bot configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token (env: DISCORD_TOKEN)
    pub discord_token: String,

    /// Discord application id (env: DISCORD_CLIENT_ID)
    pub discord_client_id: u64,

    /// Guilds the bot is allowed to operate in; empty = all guilds
    /// (env: DISCORD_GUILD_IDS, comma separated)
    pub guild_ids: Vec<u64>,

    /// Role ids treated as moderators (env: MODERATOR_ROLE_IDS)
    pub moderator_role_ids: Vec<u64>,

    /// SQLite database file path (env: DATABASE_PATH)
    pub database_path: String,

    /// Language-model service settings
    pub llm: LlmConfig,

    /// Web-search-augmented context service settings
    pub live_search: LiveSearchConfig,
}

/// OpenAI-compatible completion/embedding endpoint settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub embedding_model: String,
    pub base_url: String,
}

/// xAI live-search endpoint settings.
#[derive(Debug, Clone)]
pub struct LiveSearchConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required secret: {0}")]
    MissingSecret(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

fn split_csv_ids(value: Option<String>, name: &'static str) -> Result<Vec<u64>, ConfigError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name,
                value: entry.to_string(),
            })
        })
        .collect()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Loads `.env` first if present. Missing `DISCORD_TOKEN` or
    /// `DISCORD_CLIENT_ID` is fatal; everything else has a default or is
    /// optional (commands backed by an unconfigured service raise their
    /// own "unconfigured" failures at invocation time).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_env_inner()
    }

    pub(crate) fn from_env_inner() -> Result<Self, ConfigError> {
        let discord_token =
            env::var("DISCORD_TOKEN").map_err(|_| ConfigError::MissingSecret("DISCORD_TOKEN"))?;
        if discord_token.trim().is_empty() {
            return Err(ConfigError::MissingSecret("DISCORD_TOKEN"));
        }

        let client_id_raw = env::var("DISCORD_CLIENT_ID")
            .map_err(|_| ConfigError::MissingSecret("DISCORD_CLIENT_ID"))?;
        let discord_client_id =
            client_id_raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "DISCORD_CLIENT_ID",
                    value: client_id_raw.clone(),
                })?;

        let guild_ids = split_csv_ids(
            env::var("DISCORD_GUILD_IDS")
                .or_else(|_| env::var("DISCORD_GUILD_ID"))
                .ok(),
            "DISCORD_GUILD_IDS",
        )?;
        let moderator_role_ids =
            split_csv_ids(env::var("MODERATOR_ROLE_IDS").ok(), "MODERATOR_ROLE_IDS")?;

        Ok(Self {
            discord_token,
            discord_client_id,
            guild_ids,
            moderator_role_ids,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./data/marmot.sqlite3".to_string()),
            llm: LlmConfig {
                api_key: env::var("OPENAI_API_KEY").ok(),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                embedding_model: env::var("LLM_EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                base_url: env::var("LLM_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            },
            live_search: LiveSearchConfig {
                api_key: env::var("XAI_API_KEY").ok(),
                model: env::var("XAI_MODEL").unwrap_or_else(|_| "grok-4-fast".to_string()),
                base_url: env::var("XAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.x.ai/v1".to_string()),
            },
        })
    }

    /// Whether the bot should process events from this guild.
    ///
    /// Events with no guild (direct messages) are always allowed; an empty
    /// allowlist allows everything.
    pub fn is_guild_allowed(&self, guild_id: Option<u64>) -> bool {
        match guild_id {
            None => true,
            Some(_) if self.guild_ids.is_empty() => true,
            Some(id) => self.guild_ids.contains(&id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests mutate process-wide environment state; serialize them.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        unsafe {
            for name in [
                "DISCORD_TOKEN",
                "DISCORD_CLIENT_ID",
                "DISCORD_GUILD_IDS",
                "DISCORD_GUILD_ID",
                "MODERATOR_ROLE_IDS",
                "DATABASE_PATH",
                "OPENAI_API_KEY",
                "XAI_API_KEY",
            ] {
                env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        let result = Config::from_env_inner();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::MissingSecret("DISCORD_TOKEN")
        ));
    }

    #[test]
    fn test_minimal_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("DISCORD_TOKEN", "token");
            env::set_var("DISCORD_CLIENT_ID", "1234");
        }

        let config = Config::from_env_inner().unwrap();
        assert_eq!(config.discord_client_id, 1234);
        assert!(config.guild_ids.is_empty());
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_csv_lists_and_allowlist() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("DISCORD_TOKEN", "token");
            env::set_var("DISCORD_CLIENT_ID", "1234");
            env::set_var("DISCORD_GUILD_IDS", "10, 20,30");
            env::set_var("MODERATOR_ROLE_IDS", "7");
        }

        let config = Config::from_env_inner().unwrap();
        assert_eq!(config.guild_ids, vec![10, 20, 30]);
        assert_eq!(config.moderator_role_ids, vec![7]);
        assert!(config.is_guild_allowed(Some(20)));
        assert!(!config.is_guild_allowed(Some(99)));
        assert!(config.is_guild_allowed(None));
    }

    #[test]
    fn test_invalid_id_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("DISCORD_TOKEN", "token");
            env::set_var("DISCORD_CLIENT_ID", "not-a-number");
        }

        let result = Config::from_env_inner();
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue { name: "DISCORD_CLIENT_ID", .. }
        ));
    }
}
