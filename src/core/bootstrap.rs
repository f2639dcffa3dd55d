//! Warm start - Builds the economy and fills every cache before anything may use it.
//!
//! Sequence: schema definition, accounts, guild settings (with welcome settings), active
//! cooldowns, then the readiness signal. Until the signal fires, the cache and the cooldown
//! table reject access with `NotReady`.

use crate::{
    config::EconomySettings,
    core::{
        cache::{EconomyCache, Readiness},
        cooldown::{CooldownTable, epoch_now},
        guild::GuildDirectory,
        ledger::Ledger,
        store::Store,
        tags::TagBook,
        xp::XpAggregator,
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

/// Row counts loaded during warm start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WarmStartReport {
    /// Accounts loaded
    pub accounts: usize,
    /// Guild configurations loaded
    pub guilds: usize,
    /// Active cooldowns loaded
    pub cooldowns: usize,
}

/// Handle bundling every economy component, shared by the bot layer.
#[derive(Debug)]
pub struct Economy {
    /// Account and guild cache
    pub cache: Arc<EconomyCache>,
    /// Mutation API
    pub ledger: Ledger,
    /// Command cooldowns
    pub cooldowns: Arc<CooldownTable>,
    /// XP batching
    pub xp: Arc<XpAggregator>,
    /// Guild lifecycle and settings
    pub guilds: GuildDirectory,
    /// Guild tags
    pub tags: TagBook,
    store: Store,
    settings: EconomySettings,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Economy {
    /// Wires the components together. Nothing is loaded yet.
    #[must_use]
    pub fn new(store: Store, settings: &EconomySettings) -> Self {
        let readiness = Readiness::new();
        let cache = Arc::new(EconomyCache::new(readiness.clone()));
        let cooldowns = Arc::new(CooldownTable::new(store.clone(), readiness));
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            ledger: Ledger::new(Arc::clone(&cache), store.clone()),
            xp: Arc::new(XpAggregator::new(
                Arc::clone(&cache),
                store.clone(),
                settings.xp_flush_interval(),
            )),
            guilds: GuildDirectory::new(Arc::clone(&cache), store.clone(), Arc::clone(&cooldowns)),
            tags: TagBook::new(store.clone()),
            cache,
            cooldowns,
            store,
            settings: settings.clone(),
            shutdown_tx,
            tasks: Mutex::default(),
        }
    }

    /// Builds the economy over `db` and runs warm start.
    pub async fn bootstrap(db: DatabaseConnection, settings: &EconomySettings) -> Result<Self> {
        let economy = Self::new(Store::new(db), settings);
        economy.warm_start().await?;
        Ok(economy)
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Economy settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &EconomySettings {
        &self.settings
    }

    /// Whether warm start has completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cache.readiness().is_ready()
    }

    /// Loads every table into memory and fires the readiness signal.
    #[instrument(skip(self))]
    pub async fn warm_start(&self) -> Result<WarmStartReport> {
        self.store.migrate().await?;

        let accounts = self
            .cache
            .load_accounts(self.store.load_accounts().await?)
            .await;
        info!("Loaded {} accounts", accounts);

        let configs = self.store.load_guild_configs().await?;
        let welcomes = self.store.load_welcome_settings().await?;
        let guilds = self.cache.load_guilds(configs, welcomes).await;
        info!("Loaded {} guild configurations", guilds);

        let cooldowns = self
            .cooldowns
            .load(self.store.load_active_cooldowns(epoch_now()).await?)
            .await;
        info!("Loaded {} active cooldowns", cooldowns);

        self.cache.readiness().mark_ready();
        Ok(WarmStartReport {
            accounts,
            guilds,
            cooldowns,
        })
    }

    /// Starts the XP flush timer and the cooldown purge task.
    pub async fn start_background_tasks(&self) {
        let mut tasks = self.tasks.lock().await;
        tasks.push(Arc::clone(&self.xp).spawn(self.shutdown_tx.subscribe()));
        tasks.push(Arc::clone(&self.cooldowns).spawn_purge_task(
            self.settings.cooldown_purge_interval(),
            self.shutdown_tx.subscribe(),
        ));
    }

    /// Signals background tasks to stop and waits for them, including the final XP flush.
    pub async fn stop_background_tasks(&self) {
        self.shutdown_tx.send_replace(true);

        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        for task in tasks {
            if let Err(e) = task.await {
                error!("Background task ended abnormally: {}", e);
            }
        }

        // Awards recorded after the flush task stopped.
        self.xp.flush().await;
    }

    /// Stops background tasks, then closes the store.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down economy");
        self.stop_background_tasks().await;
        self.store.clone().close().await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::cooldown::{CommandCooldown, CooldownKey, CooldownScope};
    use crate::core::ledger::StatField;
    use crate::errors::Error;
    use crate::test_utils::{setup_test_db, setup_test_store};

    #[tokio::test]
    async fn test_not_ready_until_warm_start() -> Result<()> {
        let economy = Economy::new(setup_test_store().await?, &EconomySettings::default());

        assert!(!economy.is_ready());
        let err = economy.ledger.get(1, 1).await.unwrap_err();
        assert!(matches!(err, Error::NotReady));
        let key = CooldownKey::new(CooldownScope::User, 1, "balance");
        assert!(matches!(
            economy.cooldowns.check(&key, 0.0).await,
            Err(Error::NotReady)
        ));

        economy.warm_start().await?;
        assert!(economy.is_ready());
        assert!(matches!(
            economy.ledger.get(1, 1).await,
            Err(Error::NotRegistered { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_warm_start_loads_existing_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let settings = EconomySettings::default();

        let first = Economy::bootstrap(db.clone(), &settings).await?;
        first.guilds.join_guild(1).await?;
        first.ledger.register(1, 2).await?;
        first.ledger.withdraw(1, 2, 120).await?;
        first
            .cooldowns
            .start(
                CooldownKey::new(CooldownScope::Guild(1), 2, "work"),
                CommandCooldown {
                    rate: 300.0,
                    guild: true,
                },
            )
            .await?;
        first
            .cooldowns
            .set(CooldownKey::new(CooldownScope::User, 2, "balance"), 1.0)
            .await?;

        let second = Economy::new(Store::new(db), &settings);
        let report = second.warm_start().await?;
        assert_eq!(
            report,
            WarmStartReport {
                accounts: 1,
                guilds: 1,
                cooldowns: 1
            }
        );

        let account = second.ledger.get(1, 2).await?;
        assert_eq!((account.cash, account.vault), (120, 380));
        let key = CooldownKey::new(CooldownScope::Guild(1), 2, "work");
        assert!(second.cooldowns.check(&key, epoch_now()).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_stopping_tasks_flushes_pending_xp() -> Result<()> {
        let economy = Economy::bootstrap(setup_test_db().await?, &EconomySettings::default()).await?;
        economy.start_background_tasks().await;
        economy.ledger.register(1, 2).await?;
        economy.xp.record(1, 2, 40).await?;
        economy.ledger.edit_stat(1, 2, StatField::Level, 1).await?;

        economy.stop_background_tasks().await;

        let stored = economy.store().load_accounts().await?;
        assert_eq!((stored[0].xp, stored[0].level), (40, 2));
        assert_eq!(economy.xp.pending_rows().await, 0);

        economy.shutdown().await
    }
}
