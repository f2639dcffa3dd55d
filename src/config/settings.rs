//! Application settings loading from config.toml
//!
//! Every field has a default, so a missing file (or a missing section) yields a
//! working configuration. Only a file that exists but cannot be parsed is an error.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Settings {
    /// Discord-facing settings
    pub bot: BotSettings,
    /// Economy tuning
    pub economy: EconomySettings,
}

/// Discord-facing settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BotSettings {
    /// Prefix for text commands
    pub prefix: String,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            prefix: "mao ".to_string(),
        }
    }
}

/// Economy tuning knobs
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EconomySettings {
    /// Seconds between XP batch flushes
    pub xp_flush_interval_secs: u64,
    /// Seconds between purges of expired cooldown rows
    pub cooldown_purge_interval_secs: u64,
    /// Smallest XP award for a qualifying message
    pub xp_award_min: i64,
    /// Largest XP award for a qualifying message
    pub xp_award_max: i64,
    /// Awards allowed per member within one throttle window
    pub xp_throttle_messages: u32,
    /// Length of the throttle window in seconds
    pub xp_throttle_window_secs: u64,
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            xp_flush_interval_secs: 20,
            cooldown_purge_interval_secs: 3600,
            xp_award_min: 15,
            xp_award_max: 56,
            xp_throttle_messages: 2,
            xp_throttle_window_secs: 5,
        }
    }
}

impl EconomySettings {
    /// Period of the XP flush timer.
    #[must_use]
    pub const fn xp_flush_interval(&self) -> Duration {
        Duration::from_secs(self.xp_flush_interval_secs)
    }

    /// Period of the cooldown purge task.
    #[must_use]
    pub const fn cooldown_purge_interval(&self) -> Duration {
        Duration::from_secs(self.cooldown_purge_interval_secs)
    }

    /// Length of the per-member XP throttle window.
    #[must_use]
    pub const fn xp_throttle_window(&self) -> Duration {
        Duration::from_secs(self.xp_throttle_window_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.xp_flush_interval_secs == 0 || self.cooldown_purge_interval_secs == 0 {
            return Err(Error::Config {
                message: "Task intervals must be at least one second".to_string(),
            });
        }
        if self.xp_award_min < 0 || self.xp_award_min > self.xp_award_max {
            return Err(Error::Config {
                message: format!(
                    "Invalid XP award range {}..={}",
                    self.xp_award_min, self.xp_award_max
                ),
            });
        }
        Ok(())
    }
}

/// Parses settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    settings.economy.validate()?;
    Ok(settings)
}

/// Loads settings from a TOML file, falling back to defaults when the file does not exist.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!("No config file at {:?}, using default settings", path);
        return Ok(Settings::default());
    }

    tracing::debug!("Loading settings from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path:?}: {e}"),
    })?;
    parse_settings(&contents)
}

/// Loads settings from `MAO_CONFIG`, or ./config.toml when unset.
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var("MAO_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    load_settings(path)
}
