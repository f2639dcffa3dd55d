//! User entity - One economy account per (guild, user).
//!
//! Balances are whole currency units. `xp` only grows except when a level is bought.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pet name every new account starts with.
pub const DEFAULT_PET_NAME: &str = "none";

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Guild the account belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    /// Discord user owning the account
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// Spendable balance
    pub cash: i64,
    /// Protected balance
    pub vault: i64,
    /// Name of the user's pet
    pub pet_name: String,
    /// Experience towards the next level
    pub xp: i64,
    /// Current level, starts at 1
    pub level: i64,
}

/// Users have no relationships that the ORM needs to follow
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
