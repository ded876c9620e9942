//! Command dispatch pipeline.
//!
//! Both command families funnel through here: authorization, cooldown
//! acquisition, usage telemetry, context assembly, and failure handling
//! all live in the dispatcher so command bodies only implement their
//! domain behavior. Failures never propagate past this module; they are
//! normalized, logged, recorded, and signalled back on Discord.
//!
//! A message command blocked by its cooldown leaves a bypass entry
//! behind; a moderator reacting ⏰ to the blocked message within ten
//! minutes runs it anyway (and restarts the author's window).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use marmot_db::{CommandKind, CommandUsageRepository, UsageEvent};
use serde_json::{Map, Value, json};
use serenity::builder::{
    CreateCommand, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage,
};
use serenity::model::application::{CommandInteraction, ResolvedValue};
use serenity::model::channel::{Message, ReactionType};
use serenity::prelude::Context;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::commands::{MessageCommand, MessageContext, SlashCommand, SlashContext};
use crate::context::{HISTORY_DEPTH, REPLY_DEPTH, build_message_context};
use crate::error::BotError;
use crate::error_log::ErrorLogEntry;
use crate::gate::{HasRoles, can_run};
use crate::state::AppState;

pub const EMOJI_WAITING: &str = "⏰";
pub const EMOJI_ACCEPTED: &str = "✅";
pub const EMOJI_CONFUSED: &str = "❓";
pub const EMOJI_WARNING: &str = "⚠️";

const BYPASS_TTL: Duration = Duration::from_secs(10 * 60);
const BYPASS_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const PERMISSION_DENIED: &str = "You do not have permission to use this command.";
const FAILURE_NOTICE: &str = "⚠️ Something went wrong running that command.";

fn unicode(emoji: &str) -> ReactionType {
    ReactionType::Unicode(emoji.to_string())
}

/// Best-effort react; a failed react never aborts dispatch.
pub(crate) async fn react(ctx: &Context, msg: &Message, emoji: &str) {
    if let Err(err) = msg.react(&ctx.http, unicode(emoji)).await {
        warn!("Failed to react {} on {}: {}", emoji, msg.id, err);
    }
}

/// Best-effort removal of one of the bot's own reactions.
async fn remove_own_reaction(ctx: &Context, msg: &Message, emoji: &str) {
    if let Err(err) = msg
        .channel_id
        .delete_reaction(&ctx.http, msg.id, None, unicode(emoji))
        .await
    {
        warn!("Failed to remove {} reaction on {}: {}", emoji, msg.id, err);
    }
}

/// All commands known to the bot, by family.
#[derive(Default)]
pub struct CommandRegistry {
    slash: HashMap<String, Arc<dyn SlashCommand>>,
    message: Vec<Arc<dyn MessageCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_slash(&mut self, command: Arc<dyn SlashCommand>) {
        let name = command.name().to_string();
        if self.slash.insert(name.clone(), command).is_some() {
            warn!("Slash command '{}' registered twice; keeping the last", name);
        }
    }

    pub fn register_message(&mut self, command: Arc<dyn MessageCommand>) {
        self.message.push(command);
    }

    pub fn slash(&self, name: &str) -> Option<&Arc<dyn SlashCommand>> {
        self.slash.get(name)
    }

    /// First registered message command whose matcher accepts the
    /// message; registration order is the priority order.
    pub fn find_message(&self, msg: &Message) -> Option<&Arc<dyn MessageCommand>> {
        self.message.iter().find(|command| command.matches(msg))
    }

    pub fn message_by_name(&self, name: &str) -> Option<&Arc<dyn MessageCommand>> {
        self.message.iter().find(|command| command.name() == name)
    }

    /// Registration payloads for every slash command, for upload.
    pub fn slash_registrations(&self) -> Vec<CreateCommand> {
        self.slash.values().map(|command| command.register()).collect()
    }
}

/// A message command blocked by its cooldown, waiting for a moderator
/// to wave it through.
#[derive(Debug, Clone)]
pub struct BypassEntry {
    pub command_name: String,
    pub user_id: u64,
    pub guild_id: Option<u64>,
    created_at: Instant,
}

impl BypassEntry {
    pub fn new(command_name: impl Into<String>, user_id: u64, guild_id: Option<u64>) -> Self {
        Self {
            command_name: command_name.into(),
            user_id,
            guild_id,
            created_at: Instant::now(),
        }
    }

    #[cfg(test)]
    fn new_at(
        command_name: impl Into<String>,
        user_id: u64,
        guild_id: Option<u64>,
        created_at: Instant,
    ) -> Self {
        Self {
            command_name: command_name.into(),
            user_id,
            guild_id,
            created_at,
        }
    }
}

/// Pending bypass entries keyed by the blocked message id. Entries are
/// single-use and expire after ten minutes.
#[derive(Debug, Default)]
pub struct BypassStore {
    entries: Mutex<HashMap<u64, BypassEntry>>,
}

impl BypassStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, message_id: u64, entry: BypassEntry) {
        let mut entries = self.entries.lock().expect("bypass store poisoned");
        entries.insert(message_id, entry);
    }

    /// Remove and return the entry for a message, if it exists and has
    /// not expired. An expired entry is dropped either way.
    pub fn take(&self, message_id: u64) -> Option<BypassEntry> {
        self.take_at(message_id, Instant::now())
    }

    /// Drop every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("bypass store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_at(&self, message_id: u64, now: Instant) -> Option<BypassEntry> {
        let mut entries = self.entries.lock().expect("bypass store poisoned");
        let entry = entries.remove(&message_id)?;
        if now.duration_since(entry.created_at) >= BYPASS_TTL {
            return None;
        }
        Some(entry)
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock().expect("bypass store poisoned");
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.created_at) < BYPASS_TTL);
        before - entries.len()
    }
}

/// Outcome of the pre-execution checks for a message command. The
/// phases run in a fixed order: authorization, reply requirement,
/// cooldown. An earlier phase failing means the later ones never ran
/// (a denied invoker is never charged).
#[derive(Debug, PartialEq, Eq)]
enum MessageGate {
    Denied,
    NeedsReply,
    Blocked { remaining_ms: u64 },
    Accepted { charged: bool },
}

fn message_gate(
    command: &dyn MessageCommand,
    member: Option<&dyn HasRoles>,
    has_reply: bool,
    user_id: u64,
    guild_id: Option<u64>,
) -> MessageGate {
    if !can_run(command.allowed_role_ids(), member) {
        return MessageGate::Denied;
    }
    if command.requires_reply() && !has_reply {
        return MessageGate::NeedsReply;
    }
    match command.cooldown() {
        Some(cooldown) => match cooldown.acquire(user_id, guild_id) {
            Ok(()) => MessageGate::Accepted { charged: true },
            Err(remaining_ms) => MessageGate::Blocked { remaining_ms },
        },
        None => MessageGate::Accepted { charged: false },
    }
}

pub struct Dispatcher {
    state: Arc<AppState>,
    registry: CommandRegistry,
    bypass: Arc<BypassStore>,
}

impl Dispatcher {
    pub fn new(state: Arc<AppState>, registry: CommandRegistry) -> Self {
        Self {
            state,
            registry,
            bypass: Arc::new(BypassStore::new()),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Spawn the periodic purge of expired bypass entries.
    pub fn start_bypass_sweep(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.bypass);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(BYPASS_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!("Purged {} expired cooldown bypass entries", purged);
                }
            }
        })
    }

    pub async fn handle_slash(&self, ctx: &Context, interaction: &CommandInteraction) {
        let Some(command) = self.registry.slash(&interaction.data.name) else {
            warn!("Unknown slash command: {}", interaction.data.name);
            return;
        };

        let member = interaction.member.as_deref();
        if !can_run(
            command.allowed_role_ids(),
            member.map(|m| m as &dyn HasRoles),
        ) {
            self.respond_once(ctx, interaction, PERMISSION_DENIED).await;
            return;
        }

        let user_id = interaction.user.id.get();
        let guild_id = interaction.guild_id.map(|id| id.get());

        // A charged command gets an immediate ephemeral ack so slow
        // bodies never hit the interaction response deadline.
        let mut acked = false;
        if let Some(cooldown) = command.cooldown() {
            match cooldown.acquire(user_id, guild_id) {
                Ok(()) => {
                    let message = CreateInteractionResponseMessage::new()
                        .content(format!("{EMOJI_ACCEPTED} Processing..."))
                        .ephemeral(true);
                    match interaction
                        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
                        .await
                    {
                        Ok(()) => acked = true,
                        Err(err) => warn!("Failed to acknowledge interaction: {}", err),
                    }
                }
                Err(remaining_ms) => {
                    let seconds = remaining_ms.div_ceil(1000);
                    self.respond_once(
                        ctx,
                        interaction,
                        &format!("{EMOJI_WAITING} You can use this again in {seconds}s."),
                    )
                    .await;
                    return;
                }
            }
        }

        self.record_usage(UsageEvent {
            guild_id,
            user_id,
            command_name: command.name().to_string(),
            command_kind: CommandKind::Slash,
            parameters: slash_parameters_json(interaction),
            channel_id: Some(interaction.channel_id.get()),
            message_id: None,
        })
        .await;

        let slash_ctx = SlashContext::new(ctx, interaction, &self.state, acked);
        if let Err(err) = command.run(&slash_ctx).await {
            self.report_slash_failure(ctx, interaction, command.name(), err)
                .await;
        }
    }

    pub async fn handle_message(&self, ctx: &Context, msg: &Message) {
        let Some(command) = self.registry.find_message(msg) else {
            return;
        };

        let user_id = msg.author.id.get();
        let guild_id = msg.guild_id.map(|id| id.get());
        let member = msg.member.as_deref();

        match message_gate(
            command.as_ref(),
            member.map(|m| m as &dyn HasRoles),
            msg.message_reference.is_some(),
            user_id,
            guild_id,
        ) {
            MessageGate::Denied => {
                if let Err(err) = msg.reply(&ctx.http, PERMISSION_DENIED).await {
                    warn!("Failed to send permission denial: {}", err);
                }
            }
            MessageGate::NeedsReply => {
                react(ctx, msg, EMOJI_CONFUSED).await;
            }
            MessageGate::Blocked { remaining_ms } => {
                debug!(
                    "Cooldown blocked '{}' for user {} ({}ms left)",
                    command.name(),
                    user_id,
                    remaining_ms
                );
                react(ctx, msg, EMOJI_WAITING).await;
                self.bypass
                    .insert(msg.id.get(), BypassEntry::new(command.name(), user_id, guild_id));
            }
            MessageGate::Accepted { charged } => {
                // The accepted indicator belongs to the cooldown charge;
                // uncharged commands answer with their result alone.
                if charged {
                    react(ctx, msg, EMOJI_ACCEPTED).await;
                }
                self.run_message_tail(ctx, msg, command.as_ref(), charged).await;
            }
        }
    }

    /// A moderator waved a blocked message through by reacting ⏰.
    /// Returns whether a pending entry was consumed.
    pub async fn handle_bypass_reaction(&self, ctx: &Context, msg: &Message) -> bool {
        let Some(entry) = self.bypass.take(msg.id.get()) else {
            return false;
        };
        let Some(command) = self.registry.message_by_name(&entry.command_name) else {
            warn!("Bypass entry for unknown command '{}'", entry.command_name);
            return false;
        };

        // The bypassed run still charges the author's window.
        if let Some(cooldown) = command.cooldown() {
            cooldown.force_mark_used(entry.user_id, entry.guild_id);
        }

        react(ctx, msg, EMOJI_ACCEPTED).await;
        self.run_message_tail(ctx, msg, command.as_ref(), true).await;
        true
    }

    /// Shared back half of message dispatch: telemetry, context,
    /// execution, failure handling. `reacted_accepted` records whether
    /// a ✅ was added, so a failure only removes one that exists.
    async fn run_message_tail(
        &self,
        ctx: &Context,
        msg: &Message,
        command: &dyn MessageCommand,
        reacted_accepted: bool,
    ) {
        self.record_usage(UsageEvent {
            guild_id: msg.guild_id.map(|id| id.get()),
            user_id: msg.author.id.get(),
            command_name: command.name().to_string(),
            command_kind: CommandKind::Message,
            parameters: json!({ "content": msg.content }).to_string(),
            channel_id: Some(msg.channel_id.get()),
            message_id: Some(msg.id.get()),
        })
        .await;

        let convo = build_message_context(&ctx.http, msg, HISTORY_DEPTH, REPLY_DEPTH).await;
        let message_ctx = MessageContext {
            serenity: ctx,
            msg,
            convo,
            state: &self.state,
        };

        if let Err(err) = command.run(&message_ctx).await {
            self.report_message_failure(ctx, msg, command.name(), err, reacted_accepted)
                .await;
        }
    }

    async fn record_usage(&self, event: UsageEvent) {
        if let Err(err) = CommandUsageRepository::record(self.state.db.pool(), &event).await {
            warn!("Failed to record command usage: {}", err);
        }
    }

    /// Ephemeral one-shot response when nothing has been sent yet.
    async fn respond_once(&self, ctx: &Context, interaction: &CommandInteraction, content: &str) {
        let message = CreateInteractionResponseMessage::new()
            .content(content)
            .ephemeral(true);
        if let Err(err) = interaction
            .create_response(&ctx.http, CreateInteractionResponse::Message(message))
            .await
        {
            warn!("Failed to respond to interaction: {}", err);
        }
    }

    async fn report_slash_failure(
        &self,
        ctx: &Context,
        interaction: &CommandInteraction,
        command_name: &str,
        err: BotError,
    ) {
        let normalized = err.normalized();
        error!(
            command = command_name,
            user_id = interaction.user.id.get(),
            "Slash command failed: {}",
            normalized
        );
        self.state.error_log.push(ErrorLogEntry {
            at: Utc::now(),
            command_name: command_name.to_string(),
            command_kind: CommandKind::Slash,
            user_id: interaction.user.id.get(),
            guild_id: interaction.guild_id.map(|id| id.get()),
            channel_id: Some(interaction.channel_id.get()),
            message_id: None,
            error: normalized,
        });

        // Whether the initial response was already sent depends on how
        // far the command got; try the followup first, then fall back.
        let followup = CreateInteractionResponseFollowup::new()
            .content(FAILURE_NOTICE)
            .ephemeral(true);
        if interaction.create_followup(&ctx.http, followup).await.is_err() {
            self.respond_once(ctx, interaction, FAILURE_NOTICE).await;
        }
    }

    async fn report_message_failure(
        &self,
        ctx: &Context,
        msg: &Message,
        command_name: &str,
        err: BotError,
        reacted_accepted: bool,
    ) {
        let normalized = err.normalized();
        error!(
            command = command_name,
            user_id = msg.author.id.get(),
            "Message command failed: {}",
            normalized
        );
        self.state.error_log.push(ErrorLogEntry {
            at: Utc::now(),
            command_name: command_name.to_string(),
            command_kind: CommandKind::Message,
            user_id: msg.author.id.get(),
            guild_id: msg.guild_id.map(|id| id.get()),
            channel_id: Some(msg.channel_id.get()),
            message_id: Some(msg.id.get()),
            error: normalized,
        });

        react(ctx, msg, EMOJI_WARNING).await;
        if reacted_accepted {
            remove_own_reaction(ctx, msg, EMOJI_ACCEPTED).await;
        }
    }
}

fn slash_parameters_json(interaction: &CommandInteraction) -> String {
    let mut map = Map::new();
    for option in interaction.data.options() {
        let value = match option.value {
            ResolvedValue::String(v) => Value::from(v),
            ResolvedValue::Integer(v) => Value::from(v),
            ResolvedValue::Number(v) => Value::from(v),
            ResolvedValue::Boolean(v) => Value::from(v),
            // Snowflakes as strings, matching how Discord serializes them.
            ResolvedValue::User(user, _) => Value::from(user.id.get().to_string()),
            ResolvedValue::Channel(channel) => Value::from(channel.id.get().to_string()),
            ResolvedValue::Role(role) => Value::from(role.id.get().to_string()),
            _ => Value::Null,
        };
        map.insert(option.name.to_string(), value);
    }
    Value::Object(map).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use marmot_core::CooldownRegistry;

    struct StubCommand {
        allowed: Vec<u64>,
        requires_reply: bool,
        cooldown: Option<Arc<CooldownRegistry>>,
    }

    #[async_trait]
    impl MessageCommand for StubCommand {
        fn name(&self) -> &str {
            "stub"
        }

        fn allowed_role_ids(&self) -> &[u64] {
            &self.allowed
        }

        fn cooldown(&self) -> Option<&Arc<CooldownRegistry>> {
            self.cooldown.as_ref()
        }

        fn requires_reply(&self) -> bool {
            self.requires_reply
        }

        fn matches(&self, msg: &Message) -> bool {
            msg.content == "stub"
        }

        async fn run(&self, _ctx: &MessageContext<'_>) -> Result<(), BotError> {
            Ok(())
        }
    }

    #[test]
    fn test_denied_invoker_never_reaches_the_cooldown() {
        let registry = Arc::new(CooldownRegistry::new("llm", 120));
        let command = StubCommand {
            allowed: vec![10],
            requires_reply: false,
            cooldown: Some(Arc::clone(&registry)),
        };

        let roles: Vec<u64> = vec![99];
        let gate = message_gate(&command, Some(&roles), true, 7, Some(1));
        assert_eq!(gate, MessageGate::Denied);
        // The denial happened before the cooldown phase: nothing charged.
        assert_eq!(registry.remaining_ms(7, Some(1)), 0);
    }

    #[test]
    fn test_missing_reply_never_reaches_the_cooldown() {
        let registry = Arc::new(CooldownRegistry::new("llm", 120));
        let command = StubCommand {
            allowed: Vec::new(),
            requires_reply: true,
            cooldown: Some(Arc::clone(&registry)),
        };

        let gate = message_gate(&command, None, false, 7, Some(1));
        assert_eq!(gate, MessageGate::NeedsReply);
        assert_eq!(registry.remaining_ms(7, Some(1)), 0);
    }

    #[test]
    fn test_uncharged_command_is_accepted_without_a_charge() {
        let command = StubCommand {
            allowed: Vec::new(),
            requires_reply: false,
            cooldown: None,
        };

        // No registry: accepted every time, and never marked charged
        // (the dispatcher only reacts accepted on a charge).
        for _ in 0..2 {
            let gate = message_gate(&command, None, false, 7, Some(1));
            assert_eq!(gate, MessageGate::Accepted { charged: false });
        }
    }

    #[test]
    fn test_charged_command_blocks_inside_the_window() {
        let registry = Arc::new(CooldownRegistry::new("llm", 120));
        let command = StubCommand {
            allowed: Vec::new(),
            requires_reply: true,
            cooldown: Some(Arc::clone(&registry)),
        };

        let first = message_gate(&command, None, true, 7, Some(1));
        assert_eq!(first, MessageGate::Accepted { charged: true });

        let second = message_gate(&command, None, true, 7, Some(1));
        assert!(matches!(second, MessageGate::Blocked { remaining_ms } if remaining_ms > 0));
    }

    #[test]
    fn test_bypass_entry_is_single_use() {
        let store = BypassStore::new();
        store.insert(99, BypassEntry::new("answer", 7, Some(1)));

        let entry = store.take(99).unwrap();
        assert_eq!(entry.command_name, "answer");
        assert_eq!(entry.user_id, 7);
        assert_eq!(entry.guild_id, Some(1));
        assert!(store.take(99).is_none());
    }

    #[test]
    fn test_bypass_entry_expires() {
        let store = BypassStore::new();
        let t0 = Instant::now();
        store.insert(99, BypassEntry::new_at("answer", 7, Some(1), t0));

        assert!(store.take_at(99, t0 + BYPASS_TTL).is_none());
        // The expired entry is gone, not resurrected.
        assert!(store.take_at(99, t0).is_none());
    }

    #[test]
    fn test_purge_drops_only_expired_entries() {
        let store = BypassStore::new();
        let t0 = Instant::now();
        store.insert(1, BypassEntry::new_at("answer", 7, None, t0));
        store.insert(
            2,
            BypassEntry::new_at("acronym", 8, None, t0 + Duration::from_secs(500)),
        );

        assert_eq!(store.purge_expired_at(t0 + BYPASS_TTL), 1);
        assert_eq!(store.len(), 1);
        assert!(store.take_at(2, t0 + BYPASS_TTL).is_some());
    }

    #[test]
    fn test_blocked_message_bypass_restarts_window() {
        let registry = CooldownRegistry::new("llm", 120);
        let store = BypassStore::new();

        // First use passes and charges the window.
        assert!(registry.acquire(7, Some(1)).is_ok());
        // Second use inside the window is blocked and leaves an entry.
        let blocked = registry.acquire(7, Some(1));
        assert!(blocked.is_err());
        store.insert(99, BypassEntry::new("answer", 7, Some(1)));

        // A moderator bypass consumes the entry and restarts the window.
        let entry = store.take(99).unwrap();
        registry.force_mark_used(entry.user_id, entry.guild_id);
        assert!(registry.remaining_ms(7, Some(1)) > 0);
        assert!(store.take(99).is_none());
    }
}
