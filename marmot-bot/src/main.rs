use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marmot_bot::commands::build_registry;
use marmot_bot::discord::start_discord_bot;
use marmot_bot::dispatch::Dispatcher;
use marmot_bot::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = marmot_core::Config::from_env()?;
    info!(
        "Configuration loaded (client id: {}, {} allowed guilds)",
        config.discord_client_id,
        config.guild_ids.len()
    );

    // Initialize database
    let db = marmot_db::BotDb::new(&config.database_path).await?;
    info!("Bot database initialized");

    let token = config.discord_token.clone();
    let state = Arc::new(AppState::new(config, db)?);
    let registry = build_registry(&state);
    let dispatcher = Arc::new(Dispatcher::new(state, registry));

    let mut client = start_discord_bot(&token, dispatcher).await?;
    client.start().await?;

    Ok(())
}
