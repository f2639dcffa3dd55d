//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Registration, balance and pet commands
pub mod account;

/// Vault transfers and payouts
pub mod bank;

/// General utility commands
pub mod general;

/// Levels, leaderboard and leveling toggle
pub mod leveling;

/// Guild tags
pub mod tags;

/// Welcome message configuration
pub mod welcome;

// Export commands
pub use account::*;
pub use bank::*;
pub use general::*;
pub use leveling::*;
pub use tags::*;
pub use welcome::*;

use crate::{bot::BotData, errors::Error};

/// Every command the bot registers.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        ping(),
        help(),
        register(),
        unregister(),
        balance(),
        setpet(),
        withdraw(),
        deposit(),
        work(),
        daily(),
        level(),
        level_up(),
        leaderboard(),
        toggle_leveling(),
        welcome(),
        tag(),
    ]
}
