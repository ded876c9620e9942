//! Shared application state handed to every command and event handler.

use std::sync::Arc;
use std::time::Instant;

use marmot_core::{
    Config, CooldownDirectory, CooldownDirectoryError, CooldownOverride, CooldownRegistry,
};
use marmot_db::{BotDb, CooldownOverrideRepository, DbResult};

use crate::error_log::ErrorLog;
use crate::services::{
    LiveSearchClient, LlmClient, NewsService, SlowModeService, WikipediaService,
};

/// Default cooldown for the shared LLM registry, in seconds.
const LLM_COOLDOWN_SECS: u64 = 120;

pub struct AppState {
    pub config: Config,
    pub db: BotDb,
    pub cooldowns: CooldownDirectory,
    /// Shared registry for every LLM-backed command.
    pub llm_cooldown: Arc<CooldownRegistry>,
    pub error_log: ErrorLog,
    pub llm: LlmClient,
    pub live_search: LiveSearchClient,
    pub wikipedia: WikipediaService,
    pub news: NewsService,
    pub slow_mode: SlowModeService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, db: BotDb) -> Result<Self, CooldownDirectoryError> {
        let llm_cooldown = Arc::new(CooldownRegistry::new("llm", LLM_COOLDOWN_SECS));
        let mut cooldowns = CooldownDirectory::new();
        cooldowns.register(Arc::clone(&llm_cooldown))?;

        let llm = LlmClient::new(&config.llm);
        let live_search = LiveSearchClient::new(&config.live_search);

        Ok(Self {
            llm,
            live_search,
            wikipedia: WikipediaService::new(),
            news: NewsService::new(),
            slow_mode: SlowModeService::new(),
            db,
            cooldowns,
            llm_cooldown,
            error_log: ErrorLog::default(),
            started_at: Instant::now(),
            config,
        })
    }

    /// Load persisted cooldown overrides into every registry. Returns
    /// the number of overrides applied.
    pub async fn hydrate_cooldown_overrides(&self) -> DbResult<usize> {
        let mut applied = 0;
        for registry in self.cooldowns.list() {
            let stored =
                CooldownOverrideRepository::list_for_registry(self.db.pool(), registry.name())
                    .await?;
            let overrides: Vec<CooldownOverride> = stored
                .into_iter()
                .map(|row| CooldownOverride {
                    user_id: row.user_id,
                    guild_id: row.guild_id,
                    cooldown_secs: row.cooldown_seconds.max(0) as u64,
                })
                .collect();
            applied += overrides.len();
            registry.hydrate_overrides(&overrides);
        }
        Ok(applied)
    }

    /// A user is a moderator when they hold one of the configured
    /// moderator roles. With no roles configured, everyone qualifies.
    pub fn is_moderator(&self, role_ids: &[u64]) -> bool {
        if self.config.moderator_role_ids.is_empty() {
            return true;
        }
        role_ids
            .iter()
            .any(|role| self.config.moderator_role_ids.contains(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marmot_core::config::{LiveSearchConfig, LlmConfig};
    use marmot_db::test_helpers::create_test_db;

    async fn state_with_moderators(moderator_role_ids: Vec<u64>) -> AppState {
        let config = Config {
            discord_token: "token".to_string(),
            discord_client_id: 1,
            guild_ids: Vec::new(),
            moderator_role_ids,
            database_path: ":memory:".to_string(),
            llm: LlmConfig {
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                embedding_model: "text-embedding-3-small".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
            },
            live_search: LiveSearchConfig {
                api_key: None,
                model: "grok-4-fast".to_string(),
                base_url: "https://api.x.ai/v1".to_string(),
            },
        };
        AppState::new(config, create_test_db().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_is_moderator_with_empty_config_allows_everyone() {
        let state = state_with_moderators(Vec::new()).await;
        assert!(state.is_moderator(&[]));
        assert!(state.is_moderator(&[42]));
    }

    #[tokio::test]
    async fn test_is_moderator_requires_configured_role() {
        let state = state_with_moderators(vec![10, 20]).await;
        assert!(state.is_moderator(&[20, 99]));
        assert!(!state.is_moderator(&[99]));
        assert!(!state.is_moderator(&[]));
    }

    #[tokio::test]
    async fn test_hydrate_applies_persisted_overrides() {
        let state = state_with_moderators(Vec::new()).await;
        CooldownOverrideRepository::set(state.db.pool(), Some(1), 7, "llm", 5)
            .await
            .unwrap();

        assert_eq!(state.hydrate_cooldown_overrides().await.unwrap(), 1);
        state.llm_cooldown.mark_used(7, Some(1));
        assert!(state.llm_cooldown.remaining_ms(7, Some(1)) <= 5_000);
    }
}
