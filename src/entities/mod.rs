//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities are the durable side of the economy caches: every table here is
//! loaded in full at warm start and mirrored in memory afterwards.
//!
//! Discord snowflakes are `u64`; `SQLite` integers are `i64`. Identifiers are stored
//! bit-for-bit through [`to_db_id`] / [`from_db_id`] so the round trip is lossless.

pub mod cooldown;
pub mod guild_config;
pub mod tag;
pub mod user;
pub mod welcome;

// Re-export specific types to avoid conflicts
pub use cooldown::{Column as CooldownColumn, Entity as Cooldown, Model as CooldownModel};
pub use guild_config::{
    Column as GuildConfigColumn, Entity as GuildConfig, Model as GuildConfigModel,
};
pub use tag::{Column as TagColumn, Entity as Tag, Model as TagModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use welcome::{Column as WelcomeColumn, Entity as Welcome, Model as WelcomeModel};

/// Converts a Discord identifier to its stored representation.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub const fn to_db_id(id: u64) -> i64 {
    id as i64
}

/// Converts a stored identifier back to the Discord representation.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn from_db_id(id: i64) -> u64 {
    id as u64
}
