/// Database connection and table creation
pub mod database;

/// Application settings loading from config.toml
pub mod settings;

pub use settings::{BotSettings, EconomySettings, Settings};
