//! Shared test utilities.
//!
//! Every test gets its own in-memory `SQLite` database with all tables created.

use crate::{
    config::EconomySettings,
    core::{Economy, store::Store},
    entities::{User, UserColumn, to_db_id, user},
    errors::Result,
};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A store over a fresh in-memory database.
pub async fn setup_test_store() -> Result<Store> {
    Ok(Store::new(setup_test_db().await?))
}

/// A warm-started economy with default settings and no background tasks.
pub async fn setup_economy() -> Result<Economy> {
    init_test_tracing();
    Economy::bootstrap(setup_test_db().await?, &EconomySettings::default()).await
}

/// Registers an account with the default balances.
pub async fn register_test_account(economy: &Economy, guild_id: u64, user_id: u64) -> Result<()> {
    economy.ledger.register(guild_id, user_id).await?;
    Ok(())
}

/// Reads an account row straight from the store, bypassing the cache.
pub async fn stored_account(
    economy: &Economy,
    guild_id: u64,
    user_id: u64,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(UserColumn::GuildId.eq(to_db_id(guild_id)))
        .filter(UserColumn::UserId.eq(to_db_id(user_id)))
        .one(economy.store().connection())
        .await
        .map_err(Into::into)
}

/// Makes every later write to `users` fail, simulating an unavailable store.
pub async fn break_users_table(economy: &Economy) -> Result<()> {
    economy
        .store()
        .connection()
        .execute_unprepared("DROP TABLE users")
        .await?;
    Ok(())
}

/// Installs a test-writer subscriber once; later calls are ignored.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
