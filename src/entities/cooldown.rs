//! Cooldown entity - Expiry timestamp per (scope, user, command).
//!
//! User-scoped cooldowns are stored under the reserved guild id [`USER_SCOPE_GUILD_ID`]
//! so that the whole natural key is NOT NULL and can be used as an upsert conflict target.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Guild id stored for cooldowns that apply across every guild.
pub const USER_SCOPE_GUILD_ID: i64 = 0;

/// Cooldown database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cooldowns")]
pub struct Model {
    /// Guild the cooldown is scoped to, or [`USER_SCOPE_GUILD_ID`]
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    /// Discord user the cooldown applies to
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// Qualified command name
    #[sea_orm(primary_key, auto_increment = false)]
    pub command: String,
    /// Expiry as fractional seconds since the Unix epoch
    pub expires: f64,
}

/// `Cooldown` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
