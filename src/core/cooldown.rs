//! Cooldown table - Per-command reuse limits, mirrored to the `cooldowns` table.
//!
//! A cooldown is keyed by `(scope, user, command)`. User-scoped and guild-scoped keys never
//! collide: they are different [`CooldownScope`] variants in memory and use a reserved guild
//! id in the store.

use crate::{
    core::{cache::Readiness, store::Store},
    entities::{cooldown, from_db_id, to_db_id},
    errors::Result,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// Current time as fractional seconds since the Unix epoch.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn epoch_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Whether a cooldown applies everywhere or inside one guild.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CooldownScope {
    /// Applies to the user in every guild
    User,
    /// Applies to the user in this guild only
    Guild(u64),
}

impl CooldownScope {
    /// Guild id used for this scope in the store.
    #[must_use]
    pub const fn stored_guild_id(self) -> i64 {
        match self {
            Self::User => cooldown::USER_SCOPE_GUILD_ID,
            Self::Guild(guild_id) => to_db_id(guild_id),
        }
    }

    const fn from_stored(guild_id: i64) -> Self {
        if guild_id == cooldown::USER_SCOPE_GUILD_ID {
            Self::User
        } else {
            Self::Guild(from_db_id(guild_id))
        }
    }
}

/// Identifies one cooldown.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CooldownKey {
    /// User or guild scope
    pub scope: CooldownScope,
    /// User the cooldown applies to
    pub user_id: u64,
    /// Qualified command name
    pub command: String,
}

impl CooldownKey {
    /// Creates a key.
    pub fn new(scope: CooldownScope, user_id: u64, command: impl Into<String>) -> Self {
        Self {
            scope,
            user_id,
            command: command.into(),
        }
    }

    /// Key for invoking `command` under `rule`.
    ///
    /// Guild-scoped rules need a guild; invoked outside one (in DMs) they yield `None`.
    #[must_use]
    pub fn for_command(
        rule: CommandCooldown,
        guild_id: Option<u64>,
        user_id: u64,
        command: &str,
    ) -> Option<Self> {
        let scope = if rule.guild {
            CooldownScope::Guild(guild_id?)
        } else {
            CooldownScope::User
        };
        Some(Self::new(scope, user_id, command))
    }
}

impl From<&cooldown::Model> for CooldownKey {
    fn from(model: &cooldown::Model) -> Self {
        Self::new(
            CooldownScope::from_stored(model.guild_id),
            from_db_id(model.user_id),
            model.command.clone(),
        )
    }
}

/// Cooldown rule attached to a command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommandCooldown {
    /// Seconds between uses
    pub rate: f64,
    /// Scope the rule per guild instead of globally
    pub guild: bool,
}

/// Live cooldowns, keyed by [`CooldownKey`] with the expiry as the value.
#[derive(Debug)]
pub struct CooldownTable {
    entries: RwLock<HashMap<CooldownKey, f64>>,
    store: Store,
    readiness: Readiness,
}

impl CooldownTable {
    /// Creates an empty table gated by `readiness`.
    #[must_use]
    pub fn new(store: Store, readiness: Readiness) -> Self {
        Self {
            entries: RwLock::default(),
            store,
            readiness,
        }
    }

    /// Replaces the table contents with stored rows. Used by warm start only.
    pub async fn load(&self, rows: Vec<cooldown::Model>) -> usize {
        let mut entries = self.entries.write().await;
        entries.clear();
        entries.extend(rows.iter().map(|row| (CooldownKey::from(row), row.expires)));
        entries.len()
    }

    /// Sets the expiry of `key`, replacing any previous one, and persists it.
    pub async fn set(&self, key: CooldownKey, expires: f64) -> Result<()> {
        self.readiness.ensure_ready()?;
        self.entries.write().await.insert(key.clone(), expires);
        self.store.upsert_cooldown(&key, expires).await
    }

    /// Starts the cooldown of `key` now, lasting `rule.rate` seconds.
    pub async fn start(&self, key: CooldownKey, rule: CommandCooldown) -> Result<()> {
        self.set(key, epoch_now() + rule.rate).await
    }

    /// Seconds left on `key` at `now`, or `None` when it has lapsed or was never set.
    pub async fn check(&self, key: &CooldownKey, now: f64) -> Result<Option<f64>> {
        self.readiness.ensure_ready()?;
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .map(|expires| expires - now)
            .filter(|remaining| *remaining > 0.0))
    }

    /// Drops lapsed cooldowns from memory and the store.
    /// Returns the number of stored rows removed.
    pub async fn purge_expired(&self, now: f64) -> Result<u64> {
        self.entries
            .write()
            .await
            .retain(|_, expires| *expires > now);
        self.store.purge_cooldowns(now).await
    }

    /// Forgets every guild-scoped cooldown of `guild_id`. Stored rows are removed with the guild.
    pub async fn forget_guild(&self, guild_id: u64) {
        self.entries
            .write()
            .await
            .retain(|key, _| key.scope != CooldownScope::Guild(guild_id));
    }

    /// Number of cooldowns held in memory.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no cooldowns are held in memory.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Spawns the periodic purge. The task exits when `shutdown` flips to `true`.
    pub fn spawn_purge_task(
        self: Arc<Self>,
        period: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.purge_loop(period, shutdown))
    }

    #[instrument(skip(self, shutdown))]
    async fn purge_loop(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        info!("Cooldown purge task started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.purge_expired(epoch_now()).await {
                        Ok(0) => {}
                        Ok(purged) => debug!("Purged {} expired cooldowns", purged),
                        Err(e) => error!("Failed to purge expired cooldowns: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Cooldown purge task stopped");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::setup_test_store;

    async fn ready_table() -> Result<CooldownTable> {
        let readiness = Readiness::new();
        readiness.mark_ready();
        Ok(CooldownTable::new(setup_test_store().await?, readiness))
    }

    #[tokio::test]
    async fn test_set_then_check() -> Result<()> {
        let table = ready_table().await?;
        let key = CooldownKey::new(CooldownScope::Guild(5), 9, "work");

        table.set(key.clone(), 1_000.0).await?;
        assert_eq!(table.check(&key, 700.0).await?, Some(300.0));
        assert_eq!(table.check(&key, 1_000.0).await?, None);
        assert_eq!(table.check(&key, 1_500.0).await?, None);

        let unknown = CooldownKey::new(CooldownScope::Guild(5), 9, "daily");
        assert_eq!(table.check(&unknown, 0.0).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_overwrites() -> Result<()> {
        let table = ready_table().await?;
        let key = CooldownKey::new(CooldownScope::User, 9, "balance");

        table.set(key.clone(), 10.0).await?;
        table.set(key.clone(), 4.0).await?;
        assert_eq!(table.check(&key, 2.0).await?, Some(2.0));
        assert_eq!(table.len().await, 1);
        assert_eq!(table.store.load_active_cooldowns(0.0).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_scopes_are_disjoint() -> Result<()> {
        let table = ready_table().await?;
        let user_key = CooldownKey::new(CooldownScope::User, 9, "work");
        let guild_key = CooldownKey::new(CooldownScope::Guild(5), 9, "work");
        let other_guild = CooldownKey::new(CooldownScope::Guild(6), 9, "work");

        table.set(guild_key.clone(), 100.0).await?;
        assert_eq!(table.check(&user_key, 0.0).await?, None);
        assert_eq!(table.check(&other_guild, 0.0).await?, None);

        table.set(user_key.clone(), 50.0).await?;
        assert_eq!(table.check(&guild_key, 0.0).await?, Some(100.0));
        assert_eq!(table.store.load_active_cooldowns(0.0).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_restores_scopes() -> Result<()> {
        let table = ready_table().await?;
        let rows = vec![
            cooldown::Model {
                guild_id: cooldown::USER_SCOPE_GUILD_ID,
                user_id: 9,
                command: "balance".to_string(),
                expires: 20.0,
            },
            cooldown::Model {
                guild_id: 5,
                user_id: 9,
                command: "daily".to_string(),
                expires: 40.0,
            },
        ];
        assert_eq!(table.load(rows).await, 2);

        let user_key = CooldownKey::new(CooldownScope::User, 9, "balance");
        let guild_key = CooldownKey::new(CooldownScope::Guild(5), 9, "daily");
        assert_eq!(table.check(&user_key, 10.0).await?, Some(10.0));
        assert_eq!(table.check(&guild_key, 10.0).await?, Some(30.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_purge_and_forget_guild() -> Result<()> {
        let table = ready_table().await?;
        table
            .set(CooldownKey::new(CooldownScope::User, 1, "balance"), 5.0)
            .await?;
        table
            .set(CooldownKey::new(CooldownScope::Guild(5), 1, "work"), 50.0)
            .await?;
        table
            .set(CooldownKey::new(CooldownScope::Guild(6), 1, "work"), 50.0)
            .await?;

        assert_eq!(table.purge_expired(10.0).await?, 1);
        assert_eq!(table.len().await, 2);

        table.forget_guild(5).await;
        assert_eq!(table.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_not_ready_is_rejected() -> Result<()> {
        let table = CooldownTable::new(setup_test_store().await?, Readiness::new());
        let key = CooldownKey::new(CooldownScope::User, 1, "balance");
        assert!(matches!(
            table.check(&key, 0.0).await,
            Err(crate::errors::Error::NotReady)
        ));
        assert!(table.set(key, 1.0).await.is_err());
        Ok(())
    }

    #[test]
    fn test_key_for_command() {
        let guild_rule = CommandCooldown {
            rate: 300.0,
            guild: true,
        };
        let user_rule = CommandCooldown {
            rate: 2.0,
            guild: false,
        };

        let key = CooldownKey::for_command(guild_rule, Some(5), 1, "work").unwrap();
        assert_eq!(key.scope, CooldownScope::Guild(5));
        assert!(CooldownKey::for_command(guild_rule, None, 1, "work").is_none());

        let key = CooldownKey::for_command(user_rule, Some(5), 1, "balance").unwrap();
        assert_eq!(key.scope, CooldownScope::User);
    }

    #[tokio::test]
    async fn test_purge_task_stops_on_shutdown() -> Result<()> {
        let table = Arc::new(ready_table().await?);
        let (tx, rx) = watch::channel(false);
        let handle = Arc::clone(&table).spawn_purge_task(Duration::from_secs(3600), rx);

        tx.send(true).unwrap();
        handle.await.unwrap();
        Ok(())
    }
}
