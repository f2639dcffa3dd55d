//! Core economy logic, independent of Discord.
//!
//! The bot layer only talks to [`bootstrap::Economy`]; everything below it is plain async Rust
//! over the cache and the store.

/// Textual amount parsing
pub mod amount;
/// Warm start and the `Economy` handle
pub mod bootstrap;
/// In-memory account and guild cache
pub mod cache;
/// Command cooldowns
pub mod cooldown;
/// Guild lifecycle and settings
pub mod guild;
/// Account mutations and leaderboards
pub mod ledger;
/// Durable store adapter
pub mod store;
/// Guild tags
pub mod tags;
/// Batched XP awards
pub mod xp;

pub use bootstrap::Economy;
