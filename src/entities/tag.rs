//! Tag entity - Named snippets of text, unique per guild.
//!
//! Names are stored lowercased so lookups are case-insensitive.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tag database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    /// Guild the tag belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    /// Lowercased tag name
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    /// Discord user who created the tag
    pub owner_id: i64,
    /// Text sent when the tag is shown
    pub content: String,
    /// Number of times the tag was shown
    pub uses: i64,
    /// When the tag was created
    pub created_at: DateTimeUtc,
}

/// `Tag` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
