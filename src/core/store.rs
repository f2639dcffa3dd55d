//! Backing store adapter - The only module that issues SQL.
//!
//! Wraps the pooled `SeaORM` connection. Multi-statement operations run inside a transaction
//! obtained with `begin()`; if any statement fails the transaction is dropped before `commit()`
//! and rolls back, so every exit path releases the connection.
//!
//! Account writes are expressed as relative updates (`cash = cash + ?`). Relative updates
//! commute, which is what lets the ledger undo a cache mutation with the inverse delta when the
//! matching store write fails, even if other tasks touched the same account in between.

use crate::{
    config::database,
    core::{cache::AccountKey, cooldown::CooldownKey, ledger::StatField},
    entities::{
        Cooldown, CooldownColumn, GuildConfig, GuildConfigColumn, Tag, TagColumn, User,
        UserColumn, Welcome, WelcomeColumn, cooldown, guild_config, tag, to_db_id, user, welcome,
    },
    errors::Result,
};
use sea_orm::{
    DatabaseConnection, DbErr, IntoActiveModel, QueryOrder, Set, SqlErr, TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, trace};

/// One coalesced XP increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XpIncrement {
    /// Account receiving the XP
    pub key: AccountKey,
    /// XP to add
    pub delta: i64,
}

/// Handle to the durable store.
#[derive(Clone, Debug)]
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    /// Wraps an open connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Runs the idempotent schema definition.
    pub async fn migrate(&self) -> Result<()> {
        database::create_tables(&self.db).await
    }

    /// Closes every pooled connection.
    pub async fn close(self) -> Result<()> {
        self.db.close().await.map_err(Into::into)
    }

    /// Every stored account.
    pub async fn load_accounts(&self) -> Result<Vec<user::Model>> {
        User::find().all(&self.db).await.map_err(Into::into)
    }

    /// Every stored guild configuration.
    pub async fn load_guild_configs(&self) -> Result<Vec<guild_config::Model>> {
        GuildConfig::find().all(&self.db).await.map_err(Into::into)
    }

    /// Every stored welcome configuration.
    pub async fn load_welcome_settings(&self) -> Result<Vec<welcome::Model>> {
        Welcome::find().all(&self.db).await.map_err(Into::into)
    }

    /// Cooldowns that have not lapsed at `now`.
    pub async fn load_active_cooldowns(&self, now: f64) -> Result<Vec<cooldown::Model>> {
        Cooldown::find()
            .filter(CooldownColumn::Expires.gt(now))
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Inserts a new account row.
    pub async fn insert_account(&self, account: user::Model) -> Result<()> {
        User::insert(account.into_active_model())
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Deletes an account row. Returns the number of rows removed.
    pub async fn delete_account(&self, key: AccountKey) -> Result<u64> {
        let result = User::delete_many()
            .filter(UserColumn::GuildId.eq(to_db_id(key.guild_id)))
            .filter(UserColumn::UserId.eq(to_db_id(key.user_id)))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Adds every delta to its column in a single UPDATE. Returns the number of rows matched.
    pub async fn apply_deltas(&self, key: AccountKey, deltas: &[(StatField, i64)]) -> Result<u64> {
        apply_deltas_on(&self.db, key, deltas).await
    }

    /// Overwrites the pet name.
    pub async fn set_pet_name(&self, key: AccountKey, name: &str) -> Result<u64> {
        let result = User::update_many()
            .col_expr(UserColumn::PetName, Expr::value(name))
            .filter(UserColumn::GuildId.eq(to_db_id(key.guild_id)))
            .filter(UserColumn::UserId.eq(to_db_id(key.user_id)))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Adds a batch of XP increments inside one transaction, one row per increment.
    /// Returns the number of rows that matched an account.
    pub async fn add_xp_batch(&self, increments: &[XpIncrement]) -> Result<u64> {
        if increments.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        let mut matched = 0;
        for increment in increments {
            matched +=
                apply_deltas_on(&txn, increment.key, &[(StatField::Xp, increment.delta)]).await?;
        }
        txn.commit().await?;

        trace!("XP batch matched {} of {} rows", matched, increments.len());
        Ok(matched)
    }

    /// Inserts the cooldown or overwrites the expiry of the existing row for the same key.
    pub async fn upsert_cooldown(&self, key: &CooldownKey, expires: f64) -> Result<()> {
        let row = cooldown::ActiveModel {
            guild_id: Set(key.scope.stored_guild_id()),
            user_id: Set(to_db_id(key.user_id)),
            command: Set(key.command.clone()),
            expires: Set(expires),
        };
        Cooldown::insert(row)
            .on_conflict(
                OnConflict::columns([
                    CooldownColumn::GuildId,
                    CooldownColumn::UserId,
                    CooldownColumn::Command,
                ])
                .update_column(CooldownColumn::Expires)
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Deletes cooldowns that lapsed at or before `now`. Returns the number removed.
    pub async fn purge_cooldowns(&self, now: f64) -> Result<u64> {
        let result = Cooldown::delete_many()
            .filter(CooldownColumn::Expires.lte(now))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Inserts default configuration rows for guilds that have none.
    pub async fn insert_missing_guild_configs(
        &self,
        configs: Vec<guild_config::Model>,
    ) -> Result<u64> {
        if configs.is_empty() {
            return Ok(0);
        }

        let rows = configs.into_iter().map(|config| config.into_active_model());
        let inserted = GuildConfig::insert_many(rows)
            .on_conflict(
                OnConflict::column(GuildConfigColumn::GuildId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        match inserted {
            Ok(rows) => Ok(rows),
            // Every row conflicted.
            Err(DbErr::RecordNotInserted) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Sets the leveling flag of a guild. Returns the number of rows matched.
    pub async fn set_leveling(&self, guild_id: u64, leveling: bool) -> Result<u64> {
        let result = GuildConfig::update_many()
            .col_expr(GuildConfigColumn::Leveling, Expr::value(leveling))
            .filter(GuildConfigColumn::GuildId.eq(to_db_id(guild_id)))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Stores welcome settings and raises the guild's `welcoming` flag in one transaction.
    pub async fn save_welcome(&self, settings: welcome::Model) -> Result<()> {
        let guild_id = settings.guild_id;
        let txn = self.db.begin().await?;

        Welcome::insert(settings.into_active_model())
            .on_conflict(
                OnConflict::column(WelcomeColumn::GuildId)
                    .update_columns([
                        WelcomeColumn::Message,
                        WelcomeColumn::ChannelId,
                        WelcomeColumn::Dm,
                        WelcomeColumn::Embed,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        GuildConfig::update_many()
            .col_expr(GuildConfigColumn::Welcoming, Expr::value(true))
            .filter(GuildConfigColumn::GuildId.eq(guild_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Removes welcome settings and clears the guild's `welcoming` flag in one transaction.
    pub async fn delete_welcome(&self, guild_id: u64) -> Result<()> {
        let guild_id = to_db_id(guild_id);
        let txn = self.db.begin().await?;

        Welcome::delete_many()
            .filter(WelcomeColumn::GuildId.eq(guild_id))
            .exec(&txn)
            .await?;
        GuildConfig::update_many()
            .col_expr(GuildConfigColumn::Welcoming, Expr::value(false))
            .filter(GuildConfigColumn::GuildId.eq(guild_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Inserts a tag. Returns `false` when the guild already has a tag with that name.
    pub async fn insert_tag(&self, row: tag::Model) -> Result<bool> {
        match Tag::insert(row.into_active_model())
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Looks up a tag by its stored (lowercased) name.
    pub async fn find_tag(&self, guild_id: u64, name: &str) -> Result<Option<tag::Model>> {
        Tag::find_by_id((to_db_id(guild_id), name.to_string()))
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Tags created by `owner_id` in a guild, by name.
    pub async fn tags_by_owner(&self, guild_id: u64, owner_id: u64) -> Result<Vec<tag::Model>> {
        Tag::find()
            .filter(TagColumn::GuildId.eq(to_db_id(guild_id)))
            .filter(TagColumn::OwnerId.eq(to_db_id(owner_id)))
            .order_by_asc(TagColumn::Name)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Bumps the use counter of a tag. Returns the number of rows matched.
    pub async fn record_tag_use(&self, guild_id: u64, name: &str) -> Result<u64> {
        let result = Tag::update_many()
            .col_expr(TagColumn::Uses, Expr::col(TagColumn::Uses).add(1))
            .filter(TagColumn::GuildId.eq(to_db_id(guild_id)))
            .filter(TagColumn::Name.eq(name))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Replaces the content of a tag. Returns the number of rows matched.
    pub async fn set_tag_content(&self, guild_id: u64, name: &str, content: &str) -> Result<u64> {
        let result = Tag::update_many()
            .col_expr(TagColumn::Content, Expr::value(content))
            .filter(TagColumn::GuildId.eq(to_db_id(guild_id)))
            .filter(TagColumn::Name.eq(name))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Deletes a tag. Returns the number of rows removed.
    pub async fn delete_tag(&self, guild_id: u64, name: &str) -> Result<u64> {
        let result = Tag::delete_many()
            .filter(TagColumn::GuildId.eq(to_db_id(guild_id)))
            .filter(TagColumn::Name.eq(name))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Removes everything stored for a guild: accounts, guild-scoped cooldowns, tags, welcome
    /// settings and configuration. Returns the number of accounts removed.
    pub async fn delete_guild(&self, guild_id: u64) -> Result<u64> {
        let guild_id = to_db_id(guild_id);
        let txn = self.db.begin().await?;

        let accounts = User::delete_many()
            .filter(UserColumn::GuildId.eq(guild_id))
            .exec(&txn)
            .await?;
        Cooldown::delete_many()
            .filter(CooldownColumn::GuildId.eq(guild_id))
            .exec(&txn)
            .await?;
        Tag::delete_many()
            .filter(TagColumn::GuildId.eq(guild_id))
            .exec(&txn)
            .await?;
        Welcome::delete_many()
            .filter(WelcomeColumn::GuildId.eq(guild_id))
            .exec(&txn)
            .await?;
        GuildConfig::delete_many()
            .filter(GuildConfigColumn::GuildId.eq(guild_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        debug!(
            "Deleted guild {} with {} accounts",
            guild_id, accounts.rows_affected
        );
        Ok(accounts.rows_affected)
    }
}

async fn apply_deltas_on<C>(db: &C, key: AccountKey, deltas: &[(StatField, i64)]) -> Result<u64>
where
    C: ConnectionTrait,
{
    let mut update = User::update_many();
    for &(field, delta) in deltas {
        let column = field.column();
        update = update.col_expr(column, Expr::col(column).add(delta));
    }

    let result = update
        .filter(UserColumn::GuildId.eq(to_db_id(key.guild_id)))
        .filter(UserColumn::UserId.eq(to_db_id(key.user_id)))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{cache::Account, cooldown::CooldownScope};
    use crate::test_utils::setup_test_store;

    async fn stored_account(store: &Store, key: AccountKey) -> Option<user::Model> {
        User::find()
            .filter(UserColumn::GuildId.eq(to_db_id(key.guild_id)))
            .filter(UserColumn::UserId.eq(to_db_id(key.user_id)))
            .one(store.connection())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_apply_deltas() -> Result<()> {
        let store = setup_test_store().await?;
        let key = AccountKey::new(1, 2);
        store.insert_account(Account::new(1, 2).to_model()).await?;

        let matched = store
            .apply_deltas(key, &[(StatField::Vault, -200), (StatField::Cash, 200)])
            .await?;
        assert_eq!(matched, 1);

        let row = stored_account(&store, key).await.unwrap();
        assert_eq!(row.cash, 200);
        assert_eq!(row.vault, 300);

        let missing = store
            .apply_deltas(AccountKey::new(5, 5), &[(StatField::Cash, 1)])
            .await?;
        assert_eq!(missing, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_xp_batch_adds_per_row() -> Result<()> {
        let store = setup_test_store().await?;
        store.insert_account(Account::new(1, 1).to_model()).await?;
        store.insert_account(Account::new(1, 2).to_model()).await?;

        let matched = store
            .add_xp_batch(&[
                XpIncrement {
                    key: AccountKey::new(1, 1),
                    delta: 12,
                },
                XpIncrement {
                    key: AccountKey::new(1, 2),
                    delta: 30,
                },
                XpIncrement {
                    key: AccountKey::new(9, 9),
                    delta: 50,
                },
            ])
            .await?;
        assert_eq!(matched, 2);
        assert_eq!(stored_account(&store, AccountKey::new(1, 1)).await.unwrap().xp, 12);
        assert_eq!(stored_account(&store, AccountKey::new(1, 2)).await.unwrap().xp, 30);
        Ok(())
    }

    #[tokio::test]
    async fn test_cooldown_upsert_keeps_one_row_per_key() -> Result<()> {
        let store = setup_test_store().await?;
        let guild_key = CooldownKey::new(CooldownScope::Guild(7), 3, "work");
        let user_key = CooldownKey::new(CooldownScope::User, 3, "work");

        store.upsert_cooldown(&guild_key, 100.0).await?;
        store.upsert_cooldown(&guild_key, 250.0).await?;
        store.upsert_cooldown(&user_key, 50.0).await?;

        let rows = store.load_active_cooldowns(0.0).await?;
        assert_eq!(rows.len(), 2);
        let guild_row = rows.iter().find(|r| r.guild_id == 7).unwrap();
        assert_eq!(guild_row.expires, 250.0);

        assert_eq!(store.load_active_cooldowns(100.0).await?.len(), 1);
        assert_eq!(store.purge_cooldowns(100.0).await?, 1);
        assert_eq!(store.load_active_cooldowns(0.0).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_guild_configs_insert_is_idempotent() -> Result<()> {
        let store = setup_test_store().await?;
        let config = |guild_id| guild_config::Model {
            guild_id,
            leveling: true,
            welcoming: false,
        };

        store.insert_missing_guild_configs(vec![config(1)]).await?;
        store.set_leveling(1, false).await?;
        store
            .insert_missing_guild_configs(vec![config(1), config(2)])
            .await?;
        store.insert_missing_guild_configs(vec![config(1)]).await?;

        let configs = store.load_guild_configs().await?;
        assert_eq!(configs.len(), 2);
        assert!(!configs.iter().find(|c| c.guild_id == 1).unwrap().leveling);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_guild_removes_everything_for_that_guild() -> Result<()> {
        let store = setup_test_store().await?;
        store
            .insert_missing_guild_configs(vec![guild_config::Model {
                guild_id: 1,
                leveling: true,
                welcoming: false,
            }])
            .await?;
        store
            .save_welcome(welcome::Model {
                guild_id: 1,
                message: "hi".to_string(),
                channel_id: None,
                dm: true,
                embed: false,
            })
            .await?;
        assert!(store.load_guild_configs().await?[0].welcoming);

        store.insert_account(Account::new(1, 1).to_model()).await?;
        store.insert_account(Account::new(2, 1).to_model()).await?;
        store
            .upsert_cooldown(&CooldownKey::new(CooldownScope::Guild(1), 1, "daily"), 10.0)
            .await?;
        store
            .upsert_cooldown(&CooldownKey::new(CooldownScope::User, 1, "balance"), 10.0)
            .await?;

        assert_eq!(store.delete_guild(1).await?, 1);
        assert!(store.load_guild_configs().await?.is_empty());
        assert!(store.load_welcome_settings().await?.is_empty());
        assert_eq!(store.load_accounts().await?.len(), 1);
        assert_eq!(store.load_active_cooldowns(0.0).await?.len(), 1);
        Ok(())
    }

    fn tag_row(guild_id: i64, name: &str, owner_id: i64) -> tag::Model {
        tag::Model {
            guild_id,
            name: name.to_string(),
            owner_id,
            content: format!("{name} text"),
            uses: 0,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_tag_rows() -> Result<()> {
        let store = setup_test_store().await?;
        assert!(store.insert_tag(tag_row(1, "faq", 7)).await?);
        assert!(!store.insert_tag(tag_row(1, "faq", 8)).await?);
        assert!(store.insert_tag(tag_row(2, "faq", 8)).await?);

        assert_eq!(store.record_tag_use(1, "faq").await?, 1);
        assert_eq!(store.record_tag_use(1, "faq").await?, 1);
        assert_eq!(store.record_tag_use(1, "missing").await?, 0);
        assert_eq!(store.set_tag_content(1, "faq", "edited").await?, 1);

        let row = store.find_tag(1, "faq").await?.unwrap();
        assert_eq!((row.owner_id, row.uses, row.content.as_str()), (7, 2, "edited"));
        assert_eq!(store.find_tag(2, "faq").await?.unwrap().uses, 0);

        assert_eq!(store.delete_tag(1, "faq").await?, 1);
        assert!(store.find_tag(1, "faq").await?.is_none());
        assert_eq!(store.delete_tag(1, "faq").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_guild_removes_its_tags() -> Result<()> {
        let store = setup_test_store().await?;
        store.insert_tag(tag_row(1, "faq", 7)).await?;
        store.insert_tag(tag_row(1, "rules", 7)).await?;
        store.insert_tag(tag_row(2, "faq", 7)).await?;

        store.delete_guild(1).await?;
        assert!(store.tags_by_owner(1, 7).await?.is_empty());
        assert_eq!(store.tags_by_owner(2, 7).await?.len(), 1);
        Ok(())
    }
}
