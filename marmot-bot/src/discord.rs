//! Discord event handling and client bootstrap.
//!
//! The handler stays thin: filter events (bots, guild allowlist, the
//! slow-mode gate), then hand everything to the dispatcher. Startup
//! work (override hydration, slash registration, background sweeps)
//! runs once from the first `ready`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serenity::async_trait;
use serenity::model::application::{Command, Interaction};
use serenity::model::channel::{Message, Reaction, ReactionType};
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use tracing::{error, info, warn};

use crate::dispatch::{Dispatcher, EMOJI_WAITING};
use crate::services::ReminderScheduler;

pub struct Bot {
    dispatcher: Arc<Dispatcher>,
    background_started: AtomicBool,
}

impl Bot {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            background_started: AtomicBool::new(false),
        }
    }

    /// Idempotent across gateway reconnects.
    fn start_background_tasks(&self, ctx: &Context) {
        if self.background_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let state = self.dispatcher.state();
        ReminderScheduler::new(Arc::clone(&ctx.http), state.db.clone()).start();
        self.dispatcher.start_bypass_sweep();
    }

    /// Moderator role ids of whoever added this reaction, or `None`
    /// when the reactor is a bot or cannot be resolved.
    async fn reactor_roles(&self, ctx: &Context, reaction: &Reaction) -> Option<Vec<u64>> {
        let guild_id = reaction.guild_id?;
        if let Some(member) = &reaction.member {
            if member.user.bot {
                return None;
            }
            return Some(member.roles.iter().map(|role| role.get()).collect());
        }

        let user_id = reaction.user_id?;
        match guild_id.member(&ctx.http, user_id).await {
            Ok(member) => {
                if member.user.bot {
                    return None;
                }
                Some(member.roles.iter().map(|role| role.get()).collect())
            }
            Err(err) => {
                warn!("Failed to resolve reacting member: {}", err);
                None
            }
        }
    }
}

#[async_trait]
impl EventHandler for Bot {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let state = self.dispatcher.state();
        if !state.config.is_guild_allowed(msg.guild_id.map(|id| id.get())) {
            return;
        }

        match state.slow_mode.handle_message(&ctx, state.db.pool(), &msg).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(err) => error!("Slow mode check failed: {}", err),
        }

        self.dispatcher.handle_message(&ctx, &msg).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        let state = self.dispatcher.state();
        if !state.config.is_guild_allowed(command.guild_id.map(|id| id.get())) {
            return;
        }

        self.dispatcher.handle_slash(&ctx, &command).await;
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        match &reaction.emoji {
            ReactionType::Unicode(emoji) if emoji == EMOJI_WAITING => {}
            _ => return,
        }
        let state = self.dispatcher.state();
        if !state.config.is_guild_allowed(reaction.guild_id.map(|id| id.get())) {
            return;
        }

        let Some(roles) = self.reactor_roles(&ctx, &reaction).await else {
            return;
        };
        if !state.is_moderator(&roles) {
            return;
        }

        let msg = match reaction.channel_id.message(&ctx.http, reaction.message_id).await {
            Ok(msg) => msg,
            Err(err) => {
                warn!("Failed to fetch reacted message: {}", err);
                return;
            }
        };

        if self.dispatcher.handle_bypass_reaction(&ctx, &msg).await {
            info!(
                "Cooldown bypass redeemed on message {} by moderator reaction",
                msg.id
            );
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Discord bot connected as {}", ready.user.name);
        let state = self.dispatcher.state();

        match state.hydrate_cooldown_overrides().await {
            Ok(applied) if applied > 0 => info!("Hydrated {} cooldown overrides", applied),
            Ok(_) => {}
            Err(err) => error!("Failed to hydrate cooldown overrides: {}", err),
        }

        let commands = self.dispatcher.registry().slash_registrations();
        if state.config.guild_ids.is_empty() {
            if let Err(err) = Command::set_global_commands(&ctx.http, commands).await {
                error!("Failed to register global slash commands: {}", err);
            }
        } else {
            for guild_id in &state.config.guild_ids {
                if let Err(err) = GuildId::new(*guild_id)
                    .set_commands(&ctx.http, commands.clone())
                    .await
                {
                    error!(
                        "Failed to register slash commands in guild {}: {}",
                        guild_id, err
                    );
                }
            }
        }

        for guild in &ready.guilds {
            if !state.config.is_guild_allowed(Some(guild.id.get())) {
                info!("Leaving unapproved guild {}", guild.id);
                if let Err(err) = guild.id.leave(&ctx.http).await {
                    warn!("Failed to leave guild {}: {}", guild.id, err);
                }
            }
        }

        self.start_background_tasks(&ctx);
    }
}

/// Start the Discord client with the intents the bot needs.
pub async fn start_discord_bot(
    token: &str,
    dispatcher: Arc<Dispatcher>,
) -> Result<Client, DiscordError> {
    info!("Starting Discord bot...");

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let bot = Bot::new(dispatcher);

    Client::builder(token, intents)
        .event_handler(bot)
        .await
        .map_err(|e| DiscordError::ClientError(e.to_string()))
}

/// Discord-related errors
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("Failed to create Discord client: {0}")]
    ClientError(String),
}
