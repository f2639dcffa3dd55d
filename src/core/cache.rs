//! Guild/User cache - The in-memory mirror of the `users`, `guild_config` and `welcome` tables.
//!
//! During normal operation every read is served from here. Mutations are applied under the
//! write guard and never await anything while the guard is held, so a read-validate-write
//! sequence inside one closure is atomic with respect to every other task.
//!
//! Nothing in this module talks to the store: persistence is coordinated by the ledger and the
//! guild directory, which call back into the cache to compensate when a durable write fails.

use crate::{
    core::ledger::StatField,
    entities::{from_db_id, guild_config, to_db_id, user, welcome},
    errors::{Error, Result},
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info};

/// Vault balance every new account starts with.
pub const STARTING_VAULT: i64 = 500;

/// XP needed per level; reaching level `n + 1` costs `n * XP_PER_LEVEL`.
pub const XP_PER_LEVEL: i64 = 1000;

/// Identifies one account: a user inside a guild.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountKey {
    /// Discord guild ID
    pub guild_id: u64,
    /// Discord user ID
    pub user_id: u64,
}

impl AccountKey {
    /// Creates a key for `user_id` in `guild_id`.
    #[must_use]
    pub const fn new(guild_id: u64, user_id: u64) -> Self {
        Self { guild_id, user_id }
    }
}

/// Cached view of one economy account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Guild the account belongs to
    pub guild_id: u64,
    /// Owner of the account
    pub user_id: u64,
    /// Spendable balance
    pub cash: i64,
    /// Protected balance
    pub vault: i64,
    /// Pet name
    pub pet_name: String,
    /// XP towards the next level
    pub xp: i64,
    /// Current level
    pub level: i64,
}

impl Account {
    /// A freshly registered account.
    #[must_use]
    pub fn new(guild_id: u64, user_id: u64) -> Self {
        Self {
            guild_id,
            user_id,
            cash: 0,
            vault: STARTING_VAULT,
            pet_name: user::DEFAULT_PET_NAME.to_string(),
            xp: 0,
            level: 1,
        }
    }

    /// Key of this account.
    #[must_use]
    pub const fn key(&self) -> AccountKey {
        AccountKey::new(self.guild_id, self.user_id)
    }

    /// Cash plus vault.
    #[must_use]
    pub const fn net_worth(&self) -> i64 {
        self.cash.saturating_add(self.vault)
    }

    /// XP needed to buy the next level.
    #[must_use]
    pub const fn next_level_xp(&self) -> i64 {
        self.level.saturating_mul(XP_PER_LEVEL)
    }

    /// XP earned over the account's lifetime, including XP spent on levels.
    #[must_use]
    pub fn total_xp(&self) -> i64 {
        // Triangular sum of level costs up to and including the current level, minus one level.
        let level = i128::from(self.level);
        let spent = (level * (level + 1) / 2).saturating_mul(i128::from(XP_PER_LEVEL));
        let total = (i128::from(self.xp) - i128::from(XP_PER_LEVEL)).saturating_add(spent);
        i64::try_from(total).unwrap_or(if total < 0 { i64::MIN } else { i64::MAX })
    }

    /// Converts to the stored representation.
    #[must_use]
    pub fn to_model(&self) -> user::Model {
        user::Model {
            guild_id: to_db_id(self.guild_id),
            user_id: to_db_id(self.user_id),
            cash: self.cash,
            vault: self.vault,
            pet_name: self.pet_name.clone(),
            xp: self.xp,
            level: self.level,
        }
    }
}

impl From<user::Model> for Account {
    fn from(model: user::Model) -> Self {
        Self {
            guild_id: from_db_id(model.guild_id),
            user_id: from_db_id(model.user_id),
            cash: model.cash,
            vault: model.vault,
            pet_name: model.pet_name,
            xp: model.xp,
            level: model.level,
        }
    }
}

/// Welcome message settings for a guild.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WelcomeSettings {
    /// Message template
    pub message: String,
    /// Channel to post in, `None` when sending by DM
    pub channel_id: Option<u64>,
    /// Send the message to the member directly
    pub dm: bool,
    /// Wrap the message in an embed
    pub embed: bool,
}

impl WelcomeSettings {
    /// Converts to the stored representation.
    #[must_use]
    pub fn to_model(&self, guild_id: u64) -> welcome::Model {
        welcome::Model {
            guild_id: to_db_id(guild_id),
            message: self.message.clone(),
            channel_id: self.channel_id.map(to_db_id),
            dm: self.dm,
            embed: self.embed,
        }
    }
}

impl From<welcome::Model> for WelcomeSettings {
    fn from(model: welcome::Model) -> Self {
        Self {
            message: model.message,
            channel_id: model.channel_id.map(from_db_id),
            dm: model.dm,
            embed: model.embed,
        }
    }
}

/// Cached configuration of one guild.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuildSettings {
    /// Whether messages accrue XP
    pub leveling: bool,
    /// Whether welcome messages are enabled
    pub welcoming: bool,
    /// Welcome settings, present when `welcoming` is set
    pub welcome: Option<WelcomeSettings>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            leveling: true,
            welcoming: false,
            welcome: None,
        }
    }
}

impl GuildSettings {
    /// Converts the configuration part to the stored representation.
    #[must_use]
    pub const fn to_model(&self, guild_id: u64) -> guild_config::Model {
        guild_config::Model {
            guild_id: to_db_id(guild_id),
            leveling: self.leveling,
            welcoming: self.welcoming,
        }
    }
}

/// One-shot readiness signal shared by every cache that is filled during warm start.
#[derive(Clone, Debug)]
pub struct Readiness {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

impl Readiness {
    /// Creates a signal in the not-ready state.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Fires the signal. Subsequent calls are no-ops.
    pub fn mark_ready(&self) {
        if !self.sender.send_replace(true) {
            info!("Economy caches are ready");
        }
    }

    /// Whether the signal has fired.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.sender.borrow()
    }

    /// Fails with [`Error::NotReady`] until the signal has fired.
    pub fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(Error::NotReady)
        }
    }

    /// Waits until the signal fires.
    pub async fn wait(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only returns once ready.
        let _ = receiver.wait_for(|ready| *ready).await;
    }
}

/// In-memory mirror of accounts and guild settings.
#[derive(Debug, Default)]
pub struct EconomyCache {
    accounts: RwLock<HashMap<AccountKey, Account>>,
    guilds: RwLock<HashMap<u64, GuildSettings>>,
    readiness: Readiness,
}

impl EconomyCache {
    /// Creates an empty cache gated by `readiness`.
    #[must_use]
    pub fn new(readiness: Readiness) -> Self {
        Self {
            accounts: RwLock::default(),
            guilds: RwLock::default(),
            readiness,
        }
    }

    /// The readiness signal gating this cache.
    #[must_use]
    pub const fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    /// Waits until warm start has completed.
    pub async fn wait_until_ready(&self) {
        self.readiness.wait().await;
    }

    /// Replaces all cached accounts with `rows`. Used by warm start only.
    pub async fn load_accounts(&self, rows: Vec<user::Model>) -> usize {
        let mut accounts = self.accounts.write().await;
        accounts.clear();
        accounts.extend(rows.into_iter().map(|row| {
            let account = Account::from(row);
            (account.key(), account)
        }));
        accounts.len()
    }

    /// Replaces all cached guild settings. Used by warm start only.
    pub async fn load_guilds(
        &self,
        configs: Vec<guild_config::Model>,
        welcomes: Vec<welcome::Model>,
    ) -> usize {
        let mut welcome_by_guild: HashMap<u64, WelcomeSettings> = welcomes
            .into_iter()
            .map(|row| (from_db_id(row.guild_id), WelcomeSettings::from(row)))
            .collect();

        let mut guilds = self.guilds.write().await;
        guilds.clear();
        for config in configs {
            let guild_id = from_db_id(config.guild_id);
            guilds.insert(
                guild_id,
                GuildSettings {
                    leveling: config.leveling,
                    welcoming: config.welcoming,
                    welcome: welcome_by_guild.remove(&guild_id),
                },
            );
        }
        if !welcome_by_guild.is_empty() {
            debug!(
                "Ignored {} welcome rows without a guild config",
                welcome_by_guild.len()
            );
        }
        guilds.len()
    }

    /// Returns a copy of the account, if registered.
    pub async fn account(&self, key: AccountKey) -> Result<Option<Account>> {
        self.readiness.ensure_ready()?;
        Ok(self.accounts.read().await.get(&key).cloned())
    }

    /// Whether an account exists for `key`.
    pub async fn contains(&self, key: AccountKey) -> Result<bool> {
        self.readiness.ensure_ready()?;
        Ok(self.accounts.read().await.contains_key(&key))
    }

    /// Inserts a new account. Returns `false` and leaves the cache untouched if the key exists.
    pub async fn insert_new(&self, account: Account) -> Result<bool> {
        self.readiness.ensure_ready()?;
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.key()) {
            return Ok(false);
        }
        accounts.insert(account.key(), account);
        Ok(true)
    }

    /// Puts `account` back if its slot is empty. Returns whether it was restored.
    pub async fn restore(&self, account: Account) -> bool {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.key()) {
            return false;
        }
        accounts.insert(account.key(), account);
        true
    }

    /// Removes an account and returns it.
    pub async fn remove(&self, key: AccountKey) -> Result<Option<Account>> {
        self.readiness.ensure_ready()?;
        Ok(self.accounts.write().await.remove(&key))
    }

    /// Runs `f` against the account under the write guard.
    ///
    /// Returns `Ok(None)` when the account does not exist. When `f` fails, its error is
    /// returned as is; `f` must not have mutated the account in that case.
    pub async fn modify<T, F>(&self, key: AccountKey, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut Account) -> Result<T>,
    {
        self.readiness.ensure_ready()?;
        let mut accounts = self.accounts.write().await;
        accounts.get_mut(&key).map(f).transpose()
    }

    /// Adds each delta to its field, all or nothing. Returns `false` if the account does not
    /// exist; fails with `InvalidAmount` when a field would overflow.
    pub async fn apply_deltas(&self, key: AccountKey, deltas: &[(StatField, i64)]) -> Result<bool> {
        let applied = self
            .modify(key, |account| {
                *account = StatField::apply_all(account, deltas)?;
                Ok(())
            })
            .await?;
        Ok(applied.is_some())
    }

    /// All accounts registered in `guild_id`.
    pub async fn accounts_in_guild(&self, guild_id: u64) -> Result<Vec<Account>> {
        self.readiness.ensure_ready()?;
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .filter(|account| account.guild_id == guild_id)
            .cloned()
            .collect())
    }

    /// Number of cached accounts.
    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Settings of a known guild.
    pub async fn guild(&self, guild_id: u64) -> Result<Option<GuildSettings>> {
        self.readiness.ensure_ready()?;
        Ok(self.guilds.read().await.get(&guild_id).cloned())
    }

    /// Whether messages in `guild_id` accrue XP. Unknown guilds use the default (enabled).
    pub async fn is_leveling_enabled(&self, guild_id: u64) -> Result<bool> {
        self.readiness.ensure_ready()?;
        Ok(self
            .guilds
            .read()
            .await
            .get(&guild_id)
            .is_none_or(|settings| settings.leveling))
    }

    /// Inserts or replaces a guild's settings.
    pub async fn put_guild(&self, guild_id: u64, settings: GuildSettings) -> Result<()> {
        self.readiness.ensure_ready()?;
        self.guilds.write().await.insert(guild_id, settings);
        Ok(())
    }

    /// Runs `f` against a guild's settings, creating default settings first if missing.
    pub async fn update_guild<T, F>(&self, guild_id: u64, f: F) -> Result<T>
    where
        F: FnOnce(&mut GuildSettings) -> T,
    {
        self.readiness.ensure_ready()?;
        let mut guilds = self.guilds.write().await;
        Ok(f(guilds.entry(guild_id).or_default()))
    }

    /// Drops a guild's settings and every account registered in it.
    /// Returns the number of accounts removed.
    pub async fn remove_guild(&self, guild_id: u64) -> Result<usize> {
        self.readiness.ensure_ready()?;
        self.guilds.write().await.remove(&guild_id);
        let mut accounts = self.accounts.write().await;
        let before = accounts.len();
        accounts.retain(|key, _| key.guild_id != guild_id);
        Ok(before - accounts.len())
    }

    /// IDs of every guild with cached settings.
    pub async fn guild_ids(&self) -> Vec<u64> {
        self.guilds.read().await.keys().copied().collect()
    }
}
