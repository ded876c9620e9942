//! Named per-user cooldown registries with administrative overrides.
//!
//! A [`CooldownRegistry`] tracks the last-used instant per
//! `(guild, user)` key and answers "how long until this user may go
//! again". Several commands may share one registry (e.g. everything
//! backed by the language model shares the `llm` registry). Overrides
//! are per-key cooldown replacements that administrators set at runtime
//! and that are rehydrated from persistence at startup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Scope used for direct messages, where no guild id exists. A fixed
/// sentinel keeps DM keys and guild keys from ever colliding.
const DM_SCOPE: u64 = 0;

/// Composite cooldown key: (guild scope, user id).
type Key = (u64, u64);

fn key(user_id: u64, guild_id: Option<u64>) -> Key {
    (guild_id.unwrap_or(DM_SCOPE), user_id)
}

/// A persisted cooldown override, as rehydrated at startup.
#[derive(Debug, Clone)]
pub struct CooldownOverride {
    pub guild_id: Option<u64>,
    pub user_id: u64,
    pub cooldown_secs: u64,
}

#[derive(Debug, Default)]
struct RegistryState {
    last_used: HashMap<Key, Instant>,
    overrides: HashMap<Key, Duration>,
}

/// Per-user rate limiter identified by a normalized lowercase name.
#[derive(Debug)]
pub struct CooldownRegistry {
    name: String,
    default_cooldown: Duration,
    state: Mutex<RegistryState>,
}

impl CooldownRegistry {
    pub fn new(name: impl Into<String>, default_cooldown_secs: u64) -> Self {
        Self {
            name: name.into().trim().to_lowercase(),
            default_cooldown: Duration::from_secs(default_cooldown_secs),
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_cooldown_secs(&self) -> u64 {
        self.default_cooldown.as_secs()
    }

    /// Remaining cooldown for a user in milliseconds. Pure read.
    ///
    /// Zero if the user has never been marked, zero if the effective
    /// cooldown (override if present, else default) is zero, otherwise
    /// `effective - elapsed` floored at zero.
    pub fn remaining_ms(&self, user_id: u64, guild_id: Option<u64>) -> u64 {
        self.remaining_ms_at(user_id, guild_id, Instant::now())
    }

    /// Record that the user just used the gated feature.
    ///
    /// Must be called exactly once per successful pass through the gate;
    /// a second call restarts the window from that moment.
    pub fn mark_used(&self, user_id: u64, guild_id: Option<u64>) {
        self.mark_used_at(user_id, guild_id, Instant::now());
    }

    /// Atomic check-then-mark: succeeds (and marks the key used) only if
    /// no cooldown is pending, otherwise returns the remaining
    /// milliseconds without mutating anything.
    ///
    /// The dispatcher uses this instead of `remaining_ms` + `mark_used`
    /// so that the first caller within the window wins even when events
    /// for the same key are handled on different runtime threads.
    pub fn acquire(&self, user_id: u64, guild_id: Option<u64>) -> Result<(), u64> {
        self.acquire_at(user_id, guild_id, Instant::now())
    }

    /// Mark the key used regardless of remaining time. Used by the
    /// cooldown-bypass escalation path.
    pub fn force_mark_used(&self, user_id: u64, guild_id: Option<u64>) {
        self.mark_used_at(user_id, guild_id, Instant::now());
    }

    /// Set an administrative override for a user. `cooldown_secs == 0`
    /// disables the cooldown for that key entirely; to fall back to the
    /// registry default use [`Self::clear_user_cooldown`] instead.
    pub fn set_user_cooldown(&self, user_id: u64, cooldown_secs: u64, guild_id: Option<u64>) {
        let mut state = self.state.lock().expect("cooldown state poisoned");
        state
            .overrides
            .insert(key(user_id, guild_id), Duration::from_secs(cooldown_secs));
    }

    /// Remove any override for a user, restoring the registry default.
    pub fn clear_user_cooldown(&self, user_id: u64, guild_id: Option<u64>) {
        let mut state = self.state.lock().expect("cooldown state poisoned");
        state.overrides.remove(&key(user_id, guild_id));
    }

    /// Bulk-load persisted overrides at startup. Later entries for the
    /// same key win.
    pub fn hydrate_overrides(&self, entries: &[CooldownOverride]) {
        let mut state = self.state.lock().expect("cooldown state poisoned");
        for entry in entries {
            state.overrides.insert(
                key(entry.user_id, entry.guild_id),
                Duration::from_secs(entry.cooldown_secs),
            );
        }
    }

    pub(crate) fn remaining_ms_at(
        &self,
        user_id: u64,
        guild_id: Option<u64>,
        now: Instant,
    ) -> u64 {
        let state = self.state.lock().expect("cooldown state poisoned");
        Self::remaining_locked(&state, key(user_id, guild_id), self.default_cooldown, now)
    }

    pub(crate) fn mark_used_at(&self, user_id: u64, guild_id: Option<u64>, now: Instant) {
        let mut state = self.state.lock().expect("cooldown state poisoned");
        state.last_used.insert(key(user_id, guild_id), now);
    }

    pub(crate) fn acquire_at(
        &self,
        user_id: u64,
        guild_id: Option<u64>,
        now: Instant,
    ) -> Result<(), u64> {
        let mut state = self.state.lock().expect("cooldown state poisoned");
        let k = key(user_id, guild_id);
        let remaining = Self::remaining_locked(&state, k, self.default_cooldown, now);
        if remaining > 0 {
            return Err(remaining);
        }
        state.last_used.insert(k, now);
        Ok(())
    }

    fn remaining_locked(
        state: &RegistryState,
        k: Key,
        default_cooldown: Duration,
        now: Instant,
    ) -> u64 {
        let effective = state.overrides.get(&k).copied().unwrap_or(default_cooldown);
        if effective.is_zero() {
            return 0;
        }
        let Some(last) = state.last_used.get(&k) else {
            return 0;
        };
        let elapsed = now.duration_since(*last);
        effective.saturating_sub(elapsed).as_millis() as u64
    }
}

/// Errors raised by [`CooldownDirectory`].
#[derive(Debug, thiserror::Error)]
pub enum CooldownDirectoryError {
    #[error("A cooldown registry named '{0}' is already registered")]
    DuplicateName(String),
}

/// Named lookup across cooldown registries, used by the admin commands
/// to present registry choices and resolve the target of an override.
#[derive(Debug, Default)]
pub struct CooldownDirectory {
    registries: HashMap<String, Arc<CooldownRegistry>>,
}

impl CooldownDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a registry under its normalized name. Registering a
    /// second registry under the same name is an error: silent overwrite
    /// would only make sense for hot reload, which the bot does not do.
    pub fn register(
        &mut self,
        registry: Arc<CooldownRegistry>,
    ) -> Result<(), CooldownDirectoryError> {
        let name = registry.name().to_string();
        if self.registries.contains_key(&name) {
            return Err(CooldownDirectoryError::DuplicateName(name));
        }
        self.registries.insert(name, registry);
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<Arc<CooldownRegistry>> {
        self.registries.get(&name.trim().to_lowercase()).cloned()
    }

    pub fn list(&self) -> Vec<Arc<CooldownRegistry>> {
        let mut registries: Vec<_> = self.registries.values().cloned().collect();
        registries.sort_by(|a, b| a.name().cmp(b.name()));
        registries
    }

    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.registries.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: u64 = 42;
    const GUILD: Option<u64> = Some(900);

    #[test]
    fn test_never_used_is_zero() {
        let registry = CooldownRegistry::new("llm", 120);
        assert_eq!(registry.remaining_ms(USER, GUILD), 0);
    }

    #[test]
    fn test_window_counts_down_and_expires() {
        let registry = CooldownRegistry::new("llm", 120);
        let t0 = Instant::now();
        registry.mark_used_at(USER, GUILD, t0);

        assert_eq!(registry.remaining_ms_at(USER, GUILD, t0), 120_000);
        assert_eq!(
            registry.remaining_ms_at(USER, GUILD, t0 + Duration::from_secs(60)),
            60_000
        );
        assert_eq!(
            registry.remaining_ms_at(USER, GUILD, t0 + Duration::from_secs(120)),
            0
        );
        assert_eq!(
            registry.remaining_ms_at(USER, GUILD, t0 + Duration::from_secs(500)),
            0
        );
    }

    #[test]
    fn test_mark_used_twice_restarts_window() {
        let registry = CooldownRegistry::new("llm", 120);
        let t0 = Instant::now();
        registry.mark_used_at(USER, GUILD, t0);
        registry.mark_used_at(USER, GUILD, t0 + Duration::from_secs(100));

        assert_eq!(
            registry.remaining_ms_at(USER, GUILD, t0 + Duration::from_secs(110)),
            110_000
        );
    }

    #[test]
    fn test_zero_override_disables_cooldown() {
        let registry = CooldownRegistry::new("llm", 120);
        registry.set_user_cooldown(USER, 0, GUILD);

        let t0 = Instant::now();
        registry.mark_used_at(USER, GUILD, t0);
        assert_eq!(registry.remaining_ms_at(USER, GUILD, t0), 0);
    }

    #[test]
    fn test_clear_override_restores_default() {
        let registry = CooldownRegistry::new("llm", 120);
        registry.set_user_cooldown(USER, 0, GUILD);
        registry.clear_user_cooldown(USER, GUILD);

        let t0 = Instant::now();
        registry.mark_used_at(USER, GUILD, t0);
        assert_eq!(registry.remaining_ms_at(USER, GUILD, t0), 120_000);
    }

    #[test]
    fn test_override_replaces_default() {
        let registry = CooldownRegistry::new("llm", 120);
        registry.set_user_cooldown(USER, 10, GUILD);

        let t0 = Instant::now();
        registry.mark_used_at(USER, GUILD, t0);
        assert_eq!(registry.remaining_ms_at(USER, GUILD, t0), 10_000);
        assert_eq!(
            registry.remaining_ms_at(USER, GUILD, t0 + Duration::from_secs(10)),
            0
        );
    }

    #[test]
    fn test_dm_scope_never_collides_with_guild_scope() {
        let registry = CooldownRegistry::new("llm", 120);
        registry.set_user_cooldown(USER, 5, None);

        let t0 = Instant::now();
        registry.mark_used_at(USER, GUILD, t0);
        // Guild key still uses the default, DM override does not leak.
        assert_eq!(registry.remaining_ms_at(USER, GUILD, t0), 120_000);
        assert_eq!(registry.remaining_ms_at(USER, None, t0), 0);
    }

    #[test]
    fn test_acquire_marks_only_on_success() {
        let registry = CooldownRegistry::new("llm", 120);
        let t0 = Instant::now();

        assert!(registry.acquire_at(USER, GUILD, t0).is_ok());
        let blocked = registry.acquire_at(USER, GUILD, t0 + Duration::from_secs(60));
        assert_eq!(blocked, Err(60_000));
        // The failed acquire did not restart the window.
        assert_eq!(
            registry.remaining_ms_at(USER, GUILD, t0 + Duration::from_secs(120)),
            0
        );
    }

    #[test]
    fn test_hydrate_later_entries_win() {
        let registry = CooldownRegistry::new("llm", 120);
        registry.hydrate_overrides(&[
            CooldownOverride {
                guild_id: GUILD,
                user_id: USER,
                cooldown_secs: 30,
            },
            CooldownOverride {
                guild_id: GUILD,
                user_id: USER,
                cooldown_secs: 45,
            },
        ]);

        let t0 = Instant::now();
        registry.mark_used_at(USER, GUILD, t0);
        assert_eq!(registry.remaining_ms_at(USER, GUILD, t0), 45_000);
    }

    #[test]
    fn test_directory_case_insensitive_lookup() {
        let mut directory = CooldownDirectory::new();
        directory
            .register(Arc::new(CooldownRegistry::new("LLM", 120)))
            .unwrap();

        assert!(directory.get("llm").is_some());
        assert!(directory.get(" Llm ").is_some());
        assert!(directory.get("other").is_none());
        assert_eq!(directory.list_names(), vec!["llm".to_string()]);
    }

    #[test]
    fn test_directory_rejects_duplicate_names() {
        let mut directory = CooldownDirectory::new();
        directory
            .register(Arc::new(CooldownRegistry::new("llm", 120)))
            .unwrap();
        let result = directory.register(Arc::new(CooldownRegistry::new("Llm", 60)));

        assert!(matches!(
            result,
            Err(CooldownDirectoryError::DuplicateName(name)) if name == "llm"
        ));
    }
}
