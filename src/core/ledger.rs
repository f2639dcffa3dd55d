//! Ledger operations - The only sanctioned way to mutate an account.
//!
//! Every mutation follows the same two phases:
//! 1. validate against the cached account and apply the change, atomically under the cache's
//!    write guard;
//! 2. issue the matching durable write.
//!
//! If phase 2 fails, the cache change is undone with a compensating write and the store error is
//! returned. Balance changes are compensated with the inverse delta, which is correct even when
//! other tasks changed the same account in between because additions commute. When compensation
//! is impossible the caller gets [`Error::Desynchronized`].

use crate::{
    core::{
        cache::{Account, AccountKey, EconomyCache},
        store::Store,
    },
    entities::user,
    errors::{Error, Result},
};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Entries shown per leaderboard page.
pub const LEADERBOARD_PAGE_SIZE: usize = 10;

const OUT_OF_RANGE: &str = "That number is too large for this account to hold.";

/// Numeric account fields that can be adjusted by a delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatField {
    /// Spendable balance
    Cash,
    /// Protected balance
    Vault,
    /// Experience
    Xp,
    /// Level
    Level,
}

impl StatField {
    /// Every field, in column order.
    pub const ALL: [Self; 4] = [Self::Cash, Self::Vault, Self::Xp, Self::Level];

    /// Column backing this field.
    #[must_use]
    pub const fn column(self) -> user::Column {
        match self {
            Self::Cash => user::Column::Cash,
            Self::Vault => user::Column::Vault,
            Self::Xp => user::Column::Xp,
            Self::Level => user::Column::Level,
        }
    }

    /// Lowercase name used in commands and logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Vault => "vault",
            Self::Xp => "xp",
            Self::Level => "level",
        }
    }

    /// Current value of this field.
    #[must_use]
    pub const fn get(self, account: &Account) -> i64 {
        match self {
            Self::Cash => account.cash,
            Self::Vault => account.vault,
            Self::Xp => account.xp,
            Self::Level => account.level,
        }
    }

    /// Adds `delta` to this field of `account`.
    ///
    /// Fails with `InvalidAmount`, leaving the field as it was, when the sum leaves the `i64`
    /// range.
    pub fn apply(self, account: &mut Account, delta: i64) -> Result<()> {
        let slot = match self {
            Self::Cash => &mut account.cash,
            Self::Vault => &mut account.vault,
            Self::Xp => &mut account.xp,
            Self::Level => &mut account.level,
        };
        *slot = slot
            .checked_add(delta)
            .ok_or_else(|| Error::invalid_amount(OUT_OF_RANGE))?;
        Ok(())
    }

    /// Applies every delta to a copy of `account` and returns it, or the first failure.
    pub fn apply_all(account: &Account, deltas: &[(Self, i64)]) -> Result<Account> {
        let mut next = account.clone();
        for &(field, delta) in deltas {
            field.apply(&mut next, delta)?;
        }
        Ok(next)
    }
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| Error::InvalidField {
                name: s.to_string(),
            })
    }
}

/// Ordering used by a leaderboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LeaderboardKind {
    /// Cash plus vault
    #[default]
    Total,
    /// Cash only
    Cash,
    /// Vault only
    Vault,
    /// Level, then XP
    Level,
}

/// One row of a leaderboard page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// 1-based position across all pages
    pub rank: usize,
    /// Account owner
    pub user_id: u64,
    /// Ranked value: balance for money boards, lifetime XP for the level board
    pub value: i64,
    /// Account level
    pub level: i64,
}

/// A single page of a guild leaderboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardPage {
    /// Ordering of the page
    pub kind: LeaderboardKind,
    /// Rows on this page
    pub entries: Vec<LeaderboardEntry>,
    /// Page number after clamping, 1-based
    pub page: usize,
    /// Number of pages available, at least 1
    pub max_pages: usize,
}

/// Mutation API over cached accounts, coupled to durable writes.
#[derive(Clone, Debug)]
pub struct Ledger {
    cache: Arc<EconomyCache>,
    store: Store,
}

fn not_registered(explicit_target: bool) -> Error {
    let message = if explicit_target {
        "That user is not registered."
    } else {
        "You are not registered."
    };
    Error::NotRegistered {
        message: message.to_string(),
    }
}

fn require_positive(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(Error::invalid_amount("The amount you provided resulted in 0."));
    }
    Ok(())
}

impl Ledger {
    /// Creates a ledger over `cache`, persisting through `store`.
    #[must_use]
    pub const fn new(cache: Arc<EconomyCache>, store: Store) -> Self {
        Self { cache, store }
    }

    /// The cache this ledger mutates.
    #[must_use]
    pub const fn cache(&self) -> &Arc<EconomyCache> {
        &self.cache
    }

    /// The caller's own account.
    pub async fn get(&self, guild_id: u64, user_id: u64) -> Result<Account> {
        self.get_target(guild_id, user_id, None).await
    }

    /// Account of `target`, or of the author when no target was given.
    ///
    /// The `NotRegistered` message names the subject the way the caller asked for it.
    pub async fn get_target(
        &self,
        guild_id: u64,
        author_id: u64,
        target: Option<u64>,
    ) -> Result<Account> {
        let explicit = target.is_some_and(|id| id != author_id);
        let user_id = target.unwrap_or(author_id);
        self.cache
            .account(AccountKey::new(guild_id, user_id))
            .await?
            .ok_or_else(|| not_registered(explicit))
    }

    /// Whether the user has an account in the guild.
    pub async fn is_registered(&self, guild_id: u64, user_id: u64) -> Result<bool> {
        self.cache.contains(AccountKey::new(guild_id, user_id)).await
    }

    /// Creates an account with the starting balances.
    ///
    /// Returns `false` without touching anything when the account already exists.
    pub async fn register(&self, guild_id: u64, user_id: u64) -> Result<bool> {
        let account = Account::new(guild_id, user_id);
        if !self.cache.insert_new(account.clone()).await? {
            return Ok(false);
        }

        if let Err(err) = self.store.insert_account(account.to_model()).await {
            warn!(
                "Failed to store registration of {}/{}, removing cached account: {}",
                guild_id, user_id, err
            );
            self.cache.remove(account.key()).await?;
            return Err(err);
        }

        debug!("Registered {}/{}", guild_id, user_id);
        Ok(true)
    }

    /// Deletes an account from the cache and the store.
    ///
    /// Returns `false` when there was no account.
    pub async fn unregister(&self, guild_id: u64, user_id: u64) -> Result<bool> {
        let key = AccountKey::new(guild_id, user_id);
        let Some(removed) = self.cache.remove(key).await? else {
            return Ok(false);
        };

        if let Err(err) = self.store.delete_account(key).await {
            warn!(
                "Failed to delete {}/{} from store, restoring cached account: {}",
                guild_id, user_id, err
            );
            if !self.cache.restore(removed).await {
                return Err(desynchronized(key, "account re-registered while its deletion failed"));
            }
            return Err(err);
        }

        debug!("Unregistered {}/{}", guild_id, user_id);
        Ok(true)
    }

    /// Moves `amount` from vault to cash.
    pub async fn withdraw(&self, guild_id: u64, user_id: u64, amount: i64) -> Result<Account> {
        require_positive(amount)?;
        self.mutate(AccountKey::new(guild_id, user_id), |account| {
            if amount > account.vault {
                return Err(Error::InsufficientFunds {
                    available: account.vault,
                    requested: amount,
                });
            }
            Ok(vec![(StatField::Vault, -amount), (StatField::Cash, amount)])
        })
        .await
    }

    /// Moves `amount` from cash to vault.
    pub async fn deposit(&self, guild_id: u64, user_id: u64, amount: i64) -> Result<Account> {
        require_positive(amount)?;
        self.mutate(AccountKey::new(guild_id, user_id), |account| {
            if amount > account.cash {
                return Err(Error::InsufficientFunds {
                    available: account.cash,
                    requested: amount,
                });
            }
            Ok(vec![(StatField::Cash, -amount), (StatField::Vault, amount)])
        })
        .await
    }

    /// Adds `delta` to one field. The delta may be negative; no floor is enforced.
    pub async fn edit_stat(
        &self,
        guild_id: u64,
        user_id: u64,
        field: StatField,
        delta: i64,
    ) -> Result<Account> {
        self.mutate(AccountKey::new(guild_id, user_id), |_| {
            Ok(vec![(field, delta)])
        })
        .await
    }

    /// Buys the next level with XP.
    pub async fn level_up(&self, guild_id: u64, user_id: u64) -> Result<Account> {
        self.mutate(AccountKey::new(guild_id, user_id), |account| {
            let cost = account.next_level_xp();
            if account.xp < cost {
                return Err(Error::InsufficientXp {
                    needed: cost.saturating_sub(account.xp),
                    next_level: account.level.saturating_add(1),
                });
            }
            Ok(vec![(StatField::Xp, -cost), (StatField::Level, 1)])
        })
        .await
    }

    /// Renames the account's pet.
    pub async fn set_pet(&self, guild_id: u64, user_id: u64, name: &str) -> Result<Account> {
        let key = AccountKey::new(guild_id, user_id);
        let new_name = name.trim().to_lowercase();
        if new_name.is_empty() {
            return Err(Error::bad_argument("A pet needs a name."));
        }

        let (previous, updated) = self
            .cache
            .modify(key, |account| {
                let previous = std::mem::replace(&mut account.pet_name, new_name.clone());
                Ok((previous, account.clone()))
            })
            .await?
            .ok_or_else(|| not_registered(false))?;

        let stored = self.store.set_pet_name(key, &new_name).await;
        if matches!(stored, Ok(1..)) {
            return Ok(updated);
        }

        // Only roll back if nobody renamed the pet again in the meantime.
        let rolled_back = self
            .cache
            .modify(key, |account| {
                if account.pet_name == new_name {
                    account.pet_name = previous;
                    Ok(true)
                } else {
                    Ok(false)
                }
            })
            .await?
            .unwrap_or(false);

        match stored {
            Err(err) if rolled_back => {
                warn!("Failed to store pet name for {}/{}: {}", guild_id, user_id, err);
                Err(err)
            }
            Err(_) => Err(desynchronized(key, "pet renamed while a store write failed")),
            Ok(_) => Err(desynchronized(key, "account row missing from store")),
        }
    }

    /// One page of the guild leaderboard, served from the cache.
    pub async fn leaderboard(
        &self,
        guild_id: u64,
        kind: LeaderboardKind,
        page: usize,
    ) -> Result<LeaderboardPage> {
        let mut accounts = self.cache.accounts_in_guild(guild_id).await?;

        match kind {
            LeaderboardKind::Total => {
                accounts.sort_by_key(|a| (Reverse(a.net_worth()), a.user_id));
            }
            LeaderboardKind::Cash => accounts.sort_by_key(|a| (Reverse(a.cash), a.user_id)),
            LeaderboardKind::Vault => accounts.sort_by_key(|a| (Reverse(a.vault), a.user_id)),
            LeaderboardKind::Level => {
                accounts.sort_by_key(|a| (Reverse(a.level), Reverse(a.xp), a.user_id));
            }
        }

        let max_pages = accounts.len().div_ceil(LEADERBOARD_PAGE_SIZE).max(1);
        let page = page.clamp(1, max_pages);
        let offset = (page - 1) * LEADERBOARD_PAGE_SIZE;

        let entries = accounts
            .iter()
            .enumerate()
            .skip(offset)
            .take(LEADERBOARD_PAGE_SIZE)
            .map(|(index, account)| LeaderboardEntry {
                rank: index + 1,
                user_id: account.user_id,
                value: match kind {
                    LeaderboardKind::Total => account.net_worth(),
                    LeaderboardKind::Cash => account.cash,
                    LeaderboardKind::Vault => account.vault,
                    LeaderboardKind::Level => account.total_xp(),
                },
                level: account.level,
            })
            .collect();

        Ok(LeaderboardPage {
            kind,
            entries,
            page,
            max_pages,
        })
    }

    /// Validates and applies a set of deltas, then persists them.
    ///
    /// `plan` sees the current account and returns the deltas to apply, or a validation error.
    async fn mutate<F>(&self, key: AccountKey, plan: F) -> Result<Account>
    where
        F: FnOnce(&Account) -> Result<Vec<(StatField, i64)>>,
    {
        let (deltas, updated) = self
            .cache
            .modify(key, |account| {
                let deltas = plan(account)?;
                *account = StatField::apply_all(account, &deltas)?;
                Ok((deltas, account.clone()))
            })
            .await?
            .ok_or_else(|| not_registered(false))?;

        match self.store.apply_deltas(key, &deltas).await {
            Ok(0) => {
                self.compensate(key, &deltas).await?;
                Err(desynchronized(key, "account row missing from store"))
            }
            Ok(_) => Ok(updated),
            Err(err) => {
                warn!(
                    "Store write failed for {}/{}, reverting cached change: {}",
                    key.guild_id, key.user_id, err
                );
                self.compensate(key, &deltas).await?;
                Err(err)
            }
        }
    }

    async fn compensate(&self, key: AccountKey, deltas: &[(StatField, i64)]) -> Result<()> {
        let Some(inverse) = deltas
            .iter()
            .map(|&(field, delta)| delta.checked_neg().map(|delta| (field, delta)))
            .collect::<Option<Vec<_>>>()
        else {
            return Err(desynchronized(key, "reverting the change would overflow"));
        };
        match self.cache.apply_deltas(key, &inverse).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(desynchronized(
                key,
                "account removed before its change could be reverted",
            )),
            Err(Error::InvalidAmount { .. }) => {
                Err(desynchronized(key, "reverting the change would overflow"))
            }
            Err(e) => Err(e),
        }
    }
}

fn desynchronized(key: AccountKey, reason: &str) -> Error {
    error!(
        "Cache and store diverged for {}/{}: {}",
        key.guild_id, key.user_id, reason
    );
    Error::Desynchronized {
        guild_id: key.guild_id,
        user_id: key.user_id,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{break_users_table, setup_economy, stored_account};

    const GUILD: u64 = 1_000;
    const AUTHOR: u64 = 42;

    #[test]
    fn test_stat_field_lookup() {
        assert_eq!("vault".parse::<StatField>().unwrap(), StatField::Vault);
        assert!(matches!(StatField::Level.column(), user::Column::Level));
        let err = "gems".parse::<StatField>().unwrap_err();
        assert!(matches!(err, Error::InvalidField { name } if name == "gems"));
    }

    #[tokio::test]
    async fn test_register_is_idempotent() -> Result<()> {
        let economy = setup_economy().await?;
        let ledger = &economy.ledger;

        assert!(ledger.register(GUILD, AUTHOR).await?);
        ledger.edit_stat(GUILD, AUTHOR, StatField::Cash, 120).await?;

        assert!(!ledger.register(GUILD, AUTHOR).await?);
        let account = ledger.get(GUILD, AUTHOR).await?;
        assert_eq!(account.cash, 120);
        assert_eq!(account.vault, 500);

        let stored = stored_account(&economy, GUILD, AUTHOR).await?.unwrap();
        assert_eq!(stored.cash, 120);
        Ok(())
    }

    #[tokio::test]
    async fn test_not_registered_messages() -> Result<()> {
        let economy = setup_economy().await?;
        let ledger = &economy.ledger;

        let own = ledger.get(GUILD, AUTHOR).await.unwrap_err();
        assert_eq!(own.to_string(), "You are not registered.");

        let other = ledger.get_target(GUILD, AUTHOR, Some(7)).await.unwrap_err();
        assert_eq!(other.to_string(), "That user is not registered.");

        let self_target = ledger
            .get_target(GUILD, AUTHOR, Some(AUTHOR))
            .await
            .unwrap_err();
        assert_eq!(self_target.to_string(), "You are not registered.");
        Ok(())
    }

    #[tokio::test]
    async fn test_unregister_removes_cache_and_row() -> Result<()> {
        let economy = setup_economy().await?;
        let ledger = &economy.ledger;

        assert!(!ledger.unregister(GUILD, AUTHOR).await?);
        ledger.register(GUILD, AUTHOR).await?;
        assert!(ledger.unregister(GUILD, AUTHOR).await?);

        assert!(!ledger.is_registered(GUILD, AUTHOR).await?);
        assert!(stored_account(&economy, GUILD, AUTHOR).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_withdraw_and_deposit_conserve_money() -> Result<()> {
        let economy = setup_economy().await?;
        let ledger = &economy.ledger;
        ledger.register(GUILD, AUTHOR).await?;

        let before = ledger.get(GUILD, AUTHOR).await?.net_worth();
        for (withdraw, deposit) in [(500, 250), (100, 350), (1, 1)] {
            ledger.withdraw(GUILD, AUTHOR, withdraw).await?;
            ledger.deposit(GUILD, AUTHOR, deposit).await?;
            assert_eq!(ledger.get(GUILD, AUTHOR).await?.net_worth(), before);
        }

        let account = ledger.get(GUILD, AUTHOR).await?;
        let stored = stored_account(&economy, GUILD, AUTHOR).await?.unwrap();
        assert_eq!((stored.cash, stored.vault), (account.cash, account.vault));
        Ok(())
    }

    #[tokio::test]
    async fn test_withdraw_more_than_vault_changes_nothing() -> Result<()> {
        let economy = setup_economy().await?;
        let ledger = &economy.ledger;
        ledger.register(GUILD, AUTHOR).await?;

        let err = ledger.withdraw(GUILD, AUTHOR, 501).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientFunds {
                available: 500,
                requested: 501
            }
        ));

        let err = ledger.deposit(GUILD, AUTHOR, 1).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { available: 0, .. }));

        let account = ledger.get(GUILD, AUTHOR).await?;
        assert_eq!((account.cash, account.vault), (0, 500));
        Ok(())
    }

    #[tokio::test]
    async fn test_non_positive_amounts_are_rejected() -> Result<()> {
        let economy = setup_economy().await?;
        economy.ledger.register(GUILD, AUTHOR).await?;

        for amount in [0, -5] {
            let err = economy.ledger.withdraw(GUILD, AUTHOR, amount).await.unwrap_err();
            assert!(matches!(err, Error::InvalidAmount { .. }));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_mutations_on_unregistered_account() -> Result<()> {
        let economy = setup_economy().await?;
        let err = economy
            .ledger
            .edit_stat(GUILD, AUTHOR, StatField::Cash, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotRegistered { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_overflowing_delta_is_rejected_untouched() -> Result<()> {
        let economy = setup_economy().await?;
        let ledger = &economy.ledger;
        ledger.register(GUILD, AUTHOR).await?;
        ledger.edit_stat(GUILD, AUTHOR, StatField::Cash, 10).await?;

        let err = ledger
            .edit_stat(GUILD, AUTHOR, StatField::Cash, i64::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { .. }));

        let account = ledger.get(GUILD, AUTHOR).await?;
        assert_eq!(account.cash, 10);
        let stored = stored_account(&economy, GUILD, AUTHOR).await?.unwrap();
        assert_eq!(stored.cash, 10);

        // A withdraw whose cash side would overflow leaves the vault alone too.
        ledger
            .edit_stat(GUILD, AUTHOR, StatField::Cash, i64::MAX - 10)
            .await?;
        let err = ledger.withdraw(GUILD, AUTHOR, 1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAmount { .. }));
        let account = ledger.get(GUILD, AUTHOR).await?;
        assert_eq!((account.cash, account.vault), (i64::MAX, 500));
        Ok(())
    }

    #[tokio::test]
    async fn test_extreme_values_do_not_panic() -> Result<()> {
        let economy = setup_economy().await?;
        let ledger = &economy.ledger;
        ledger.register(GUILD, AUTHOR).await?;
        ledger
            .edit_stat(GUILD, AUTHOR, StatField::Level, i64::MAX - 1)
            .await?;
        ledger
            .edit_stat(GUILD, AUTHOR, StatField::Vault, i64::MAX - 500)
            .await?;
        ledger.edit_stat(GUILD, AUTHOR, StatField::Cash, 1).await?;

        let account = ledger.get(GUILD, AUTHOR).await?;
        assert_eq!(account.net_worth(), i64::MAX);
        assert_eq!(account.total_xp(), i64::MAX);
        assert_eq!(account.next_level_xp(), i64::MAX);

        let err = ledger.level_up(GUILD, AUTHOR).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientXp {
                needed: i64::MAX,
                next_level: i64::MAX
            }
        ));

        let board = ledger.leaderboard(GUILD, LeaderboardKind::Level, 1).await?;
        assert_eq!(board.entries[0].value, i64::MAX);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_withdrawals_never_overdraw() -> Result<()> {
        let economy = setup_economy().await?;
        economy.ledger.register(GUILD, AUTHOR).await?;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..20 {
            let ledger = economy.ledger.clone();
            tasks.spawn(async move { ledger.withdraw(GUILD, AUTHOR, 100).await });
        }

        let mut succeeded = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(_) => succeeded += 1,
                Err(Error::InsufficientFunds { .. }) => {}
                Err(other) => return Err(other),
            }
        }
        assert_eq!(succeeded, 5);

        let account = economy.ledger.get(GUILD, AUTHOR).await?;
        assert_eq!((account.cash, account.vault), (500, 0));
        let stored = stored_account(&economy, GUILD, AUTHOR).await?.unwrap();
        assert_eq!((stored.cash, stored.vault), (500, 0));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_transfers_conserve_money() -> Result<()> {
        let economy = setup_economy().await?;
        economy.ledger.register(GUILD, AUTHOR).await?;
        economy
            .ledger
            .edit_stat(GUILD, AUTHOR, StatField::Cash, 500)
            .await?;

        let mut tasks = tokio::task::JoinSet::new();
        for round in 0..30 {
            let ledger = economy.ledger.clone();
            tasks.spawn(async move {
                if round % 2 == 0 {
                    ledger.withdraw(GUILD, AUTHOR, 70).await
                } else {
                    ledger.deposit(GUILD, AUTHOR, 70).await
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(_) | Err(Error::InsufficientFunds { .. }) => {}
                Err(other) => return Err(other),
            }
        }

        let account = economy.ledger.get(GUILD, AUTHOR).await?;
        assert_eq!(account.net_worth(), 1_000);
        assert!(account.cash >= 0 && account.vault >= 0);
        let stored = stored_account(&economy, GUILD, AUTHOR).await?.unwrap();
        assert_eq!((stored.cash, stored.vault), (account.cash, account.vault));
        Ok(())
    }

    #[tokio::test]
    async fn test_level_up_spends_xp() -> Result<()> {
        let economy = setup_economy().await?;
        let ledger = &economy.ledger;
        ledger.register(GUILD, AUTHOR).await?;
        ledger.edit_stat(GUILD, AUTHOR, StatField::Xp, 750).await?;

        let err = ledger.level_up(GUILD, AUTHOR).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientXp {
                needed: 250,
                next_level: 2
            }
        ));

        ledger.edit_stat(GUILD, AUTHOR, StatField::Xp, 400).await?;
        let account = ledger.level_up(GUILD, AUTHOR).await?;
        assert_eq!((account.level, account.xp), (2, 150));

        let stored = stored_account(&economy, GUILD, AUTHOR).await?.unwrap();
        assert_eq!((stored.level, stored.xp), (2, 150));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_pet_persists() -> Result<()> {
        let economy = setup_economy().await?;
        economy.ledger.register(GUILD, AUTHOR).await?;

        let account = economy.ledger.set_pet(GUILD, AUTHOR, "  Croc ").await?;
        assert_eq!(account.pet_name, "croc");
        let stored = stored_account(&economy, GUILD, AUTHOR).await?.unwrap();
        assert_eq!(stored.pet_name, "croc");

        let blank = economy.ledger.set_pet(GUILD, AUTHOR, "   ").await;
        assert!(matches!(blank, Err(Error::BadArgument { .. })));
        assert_eq!(economy.ledger.get(GUILD, AUTHOR).await?.pet_name, "croc");
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_reverts_cached_change() -> Result<()> {
        let economy = setup_economy().await?;
        let ledger = &economy.ledger;
        ledger.register(GUILD, AUTHOR).await?;
        ledger.withdraw(GUILD, AUTHOR, 200).await?;

        break_users_table(&economy).await?;

        let err = ledger.deposit(GUILD, AUTHOR, 100).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
        let account = ledger.get(GUILD, AUTHOR).await?;
        assert_eq!((account.cash, account.vault), (200, 300));

        let err = ledger.set_pet(GUILD, AUTHOR, "rex").await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
        assert_eq!(
            ledger.get(GUILD, AUTHOR).await?.pet_name,
            user::DEFAULT_PET_NAME
        );

        let err = ledger.unregister(GUILD, AUTHOR).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
        assert!(ledger.is_registered(GUILD, AUTHOR).await?);

        let err = ledger.register(GUILD, 7).await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
        assert!(!ledger.is_registered(GUILD, 7).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_store_row_reports_desync() -> Result<()> {
        let economy = setup_economy().await?;
        let ledger = &economy.ledger;
        ledger.register(GUILD, AUTHOR).await?;

        // Remove the row behind the cache's back.
        economy.store().delete_account(AccountKey::new(GUILD, AUTHOR)).await?;

        let err = ledger.withdraw(GUILD, AUTHOR, 10).await.unwrap_err();
        assert!(matches!(err, Error::Desynchronized { .. }));
        assert_eq!(ledger.get(GUILD, AUTHOR).await?.vault, 500);
        Ok(())
    }

    #[tokio::test]
    async fn test_leaderboard_orders_and_pages() -> Result<()> {
        let economy = setup_economy().await?;
        let ledger = &economy.ledger;
        for user_id in 1..=12 {
            ledger.register(GUILD, user_id).await?;
            ledger
                .edit_stat(GUILD, user_id, StatField::Cash, i64::try_from(user_id).unwrap() * 10)
                .await?;
        }
        ledger.register(GUILD + 1, 99).await?;
        ledger.edit_stat(GUILD, 3, StatField::Level, 4).await?;

        let first = ledger.leaderboard(GUILD, LeaderboardKind::Total, 1).await?;
        assert_eq!(first.max_pages, 2);
        assert_eq!(first.entries.len(), 10);
        assert_eq!(first.entries[0].user_id, 12);
        assert_eq!(first.entries[0].value, 620);

        let last = ledger.leaderboard(GUILD, LeaderboardKind::Cash, 50).await?;
        assert_eq!(last.page, 2);
        assert_eq!(last.entries.len(), 2);
        assert_eq!(last.entries[0].rank, 11);
        assert_eq!(last.entries[1].user_id, 1);

        let levels = ledger.leaderboard(GUILD, LeaderboardKind::Level, 0).await?;
        assert_eq!(levels.page, 1);
        assert_eq!(levels.entries[0].user_id, 3);
        assert_eq!(levels.entries[0].level, 5);

        let empty = ledger.leaderboard(GUILD + 2, LeaderboardKind::Vault, 3).await?;
        assert_eq!((empty.page, empty.max_pages), (1, 1));
        assert!(empty.entries.is_empty());
        Ok(())
    }
}
