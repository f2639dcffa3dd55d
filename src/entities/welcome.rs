//! Welcome entity - Per-guild welcome message settings.
//!
//! The content is owned by the welcome feature; the economy only loads and caches it
//! together with the guild configuration.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Welcome settings database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "welcome")]
pub struct Model {
    /// Discord guild ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    /// Message template sent when a member joins
    pub message: String,
    /// Channel to post in; `None` when the message goes to DMs
    pub channel_id: Option<i64>,
    /// Send the message to the member directly
    pub dm: bool,
    /// Wrap the message in an embed
    pub embed: bool,
}

/// `Welcome` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
