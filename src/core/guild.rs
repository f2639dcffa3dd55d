//! Guild lifecycle and per-guild settings.
//!
//! Settings are absolute values changed rarely by moderators, so they are persisted first and
//! only cached once the store accepted them.

use crate::{
    core::{
        cache::{EconomyCache, GuildSettings, WelcomeSettings},
        cooldown::CooldownTable,
        store::Store,
    },
    errors::Result,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Guild-level operations over the cache and the store.
#[derive(Clone, Debug)]
pub struct GuildDirectory {
    cache: Arc<EconomyCache>,
    store: Store,
    cooldowns: Arc<CooldownTable>,
}

impl GuildDirectory {
    /// Creates a directory over the shared cache and cooldown table.
    #[must_use]
    pub const fn new(cache: Arc<EconomyCache>, store: Store, cooldowns: Arc<CooldownTable>) -> Self {
        Self {
            cache,
            store,
            cooldowns,
        }
    }

    /// Registers a guild with default settings. Does nothing for a known guild.
    pub async fn join_guild(&self, guild_id: u64) -> Result<bool> {
        if self.cache.guild(guild_id).await?.is_some() {
            return Ok(false);
        }

        let settings = GuildSettings::default();
        self.store
            .insert_missing_guild_configs(vec![settings.to_model(guild_id)])
            .await?;
        self.cache.put_guild(guild_id, settings).await?;
        info!("Joined guild {}", guild_id);
        Ok(true)
    }

    /// Forgets a guild: its settings, welcome message, cooldowns, tags and every account in it.
    /// Returns the number of accounts removed.
    pub async fn leave_guild(&self, guild_id: u64) -> Result<u64> {
        let removed = self.store.delete_guild(guild_id).await?;
        self.cache.remove_guild(guild_id).await?;
        self.cooldowns.forget_guild(guild_id).await;
        info!("Left guild {}, removed {} accounts", guild_id, removed);
        Ok(removed)
    }

    /// Makes sure every guild the bot is in has settings. Returns how many were added.
    pub async fn ensure_guilds<I>(&self, guild_ids: I) -> Result<usize>
    where
        I: IntoIterator<Item = u64>,
    {
        let known = self.cache.guild_ids().await;
        let mut missing: Vec<u64> = guild_ids
            .into_iter()
            .filter(|guild_id| !known.contains(guild_id))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        if missing.is_empty() {
            return Ok(0);
        }

        let defaults = GuildSettings::default();
        self.store
            .insert_missing_guild_configs(
                missing
                    .iter()
                    .map(|&guild_id| defaults.to_model(guild_id))
                    .collect(),
            )
            .await?;
        for &guild_id in &missing {
            self.cache.put_guild(guild_id, defaults.clone()).await?;
        }

        debug!("Added settings for {} guilds", missing.len());
        Ok(missing.len())
    }

    /// Whether messages in the guild accrue XP.
    pub async fn is_leveling_enabled(&self, guild_id: u64) -> Result<bool> {
        self.cache.is_leveling_enabled(guild_id).await
    }

    /// Sets the leveling flag.
    pub async fn set_leveling(&self, guild_id: u64, enabled: bool) -> Result<()> {
        self.join_guild(guild_id).await?;
        self.store.set_leveling(guild_id, enabled).await?;
        self.cache
            .update_guild(guild_id, |settings| settings.leveling = enabled)
            .await
    }

    /// Flips the leveling flag and returns the new value.
    pub async fn toggle_leveling(&self, guild_id: u64) -> Result<bool> {
        let enabled = !self.is_leveling_enabled(guild_id).await?;
        self.set_leveling(guild_id, enabled).await?;
        Ok(enabled)
    }

    /// Welcome settings of the guild, if welcoming is enabled.
    pub async fn welcome(&self, guild_id: u64) -> Result<Option<WelcomeSettings>> {
        Ok(self
            .cache
            .guild(guild_id)
            .await?
            .filter(|settings| settings.welcoming)
            .and_then(|settings| settings.welcome))
    }

    /// Stores welcome settings and enables welcoming.
    pub async fn set_welcome(&self, guild_id: u64, welcome: WelcomeSettings) -> Result<()> {
        self.join_guild(guild_id).await?;
        self.store.save_welcome(welcome.to_model(guild_id)).await?;
        self.cache
            .update_guild(guild_id, |settings| {
                settings.welcoming = true;
                settings.welcome = Some(welcome);
            })
            .await
    }

    /// Removes welcome settings and disables welcoming.
    pub async fn clear_welcome(&self, guild_id: u64) -> Result<()> {
        self.store.delete_welcome(guild_id).await?;
        self.cache
            .update_guild(guild_id, |settings| {
                settings.welcoming = false;
                settings.welcome = None;
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::cooldown::{CooldownKey, CooldownScope};
    use crate::test_utils::{register_test_account, setup_economy};

    #[tokio::test]
    async fn test_join_is_idempotent() -> Result<()> {
        let economy = setup_economy().await?;
        let guilds = &economy.guilds;

        assert!(guilds.join_guild(1).await?);
        guilds.set_leveling(1, false).await?;
        assert!(!guilds.join_guild(1).await?);

        assert!(!guilds.is_leveling_enabled(1).await?);
        assert_eq!(economy.store().load_guild_configs().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_leveling_round_trip() -> Result<()> {
        let economy = setup_economy().await?;
        let guilds = &economy.guilds;

        assert!(!guilds.toggle_leveling(3).await?);
        assert!(!guilds.is_leveling_enabled(3).await?);
        assert!(guilds.toggle_leveling(3).await?);

        let stored = economy.store().load_guild_configs().await?;
        assert!(stored[0].leveling);
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_guilds_only_adds_missing() -> Result<()> {
        let economy = setup_economy().await?;
        economy.guilds.join_guild(1).await?;
        economy.guilds.set_leveling(1, false).await?;

        assert_eq!(economy.guilds.ensure_guilds([1, 2, 3, 3]).await?, 2);
        assert_eq!(economy.guilds.ensure_guilds([1, 2]).await?, 0);
        assert!(!economy.guilds.is_leveling_enabled(1).await?);
        assert_eq!(economy.store().load_guild_configs().await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_welcome_settings() -> Result<()> {
        let economy = setup_economy().await?;
        let guilds = &economy.guilds;
        let welcome = WelcomeSettings {
            message: "Welcome!".to_string(),
            channel_id: Some(44),
            dm: false,
            embed: true,
        };

        assert!(guilds.welcome(1).await?.is_none());
        guilds.set_welcome(1, welcome.clone()).await?;
        assert_eq!(guilds.welcome(1).await?, Some(welcome));
        assert!(economy.store().load_guild_configs().await?[0].welcoming);

        guilds.clear_welcome(1).await?;
        assert!(guilds.welcome(1).await?.is_none());
        assert!(economy.store().load_welcome_settings().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_leave_guild_drops_accounts_and_cooldowns() -> Result<()> {
        let economy = setup_economy().await?;
        economy.guilds.join_guild(1).await?;
        register_test_account(&economy, 1, 10).await?;
        register_test_account(&economy, 1, 11).await?;
        register_test_account(&economy, 2, 10).await?;
        economy
            .cooldowns
            .set(CooldownKey::new(CooldownScope::Guild(1), 10, "work"), 1e12)
            .await?;
        economy
            .cooldowns
            .set(CooldownKey::new(CooldownScope::User, 10, "balance"), 1e12)
            .await?;

        assert_eq!(economy.guilds.leave_guild(1).await?, 2);
        assert!(!economy.ledger.is_registered(1, 10).await?);
        assert!(economy.ledger.is_registered(2, 10).await?);
        assert!(economy.cache.guild(1).await?.is_none());
        assert_eq!(economy.cooldowns.len().await, 1);
        assert_eq!(economy.store().load_accounts().await?.len(), 1);
        Ok(())
    }
}
