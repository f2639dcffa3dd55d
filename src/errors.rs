//! Unified error types for the economy core and the bot layer.
//!
//! Validation failures (`NotRegistered`, `InsufficientFunds`, `InvalidAmount`, `BadArgument`,
//! `InsufficientXp`) are raised before anything reaches the store and are meant to be shown to
//! the caller verbatim.
//! Store failures surface as `StoreUnavailable`; a store failure whose cache compensation could not
//! be applied surfaces as `Desynchronized`.

use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Lookup against an account key that has no entry.
    #[error("{message}")]
    NotRegistered {
        /// Caller-facing message ("You are not registered." / "That user is not registered.")
        message: String,
    },

    /// A withdraw or deposit asked for more than the source balance holds.
    #[error("Insufficient funds: you have {available} but tried to move {requested}")]
    InsufficientFunds {
        /// Balance of the source side of the transfer
        available: i64,
        /// Amount that was requested
        requested: i64,
    },

    /// A textual or numeric amount failed validation.
    #[error("{message}")]
    InvalidAmount {
        /// Caller-facing reason
        message: String,
    },

    /// A name or text argument failed validation.
    #[error("{message}")]
    BadArgument {
        /// Caller-facing reason
        message: String,
    },

    /// Not enough XP to buy the next level.
    #[error("You need {needed} more XP in order to level up to level {next_level}")]
    InsufficientXp {
        /// XP still missing
        needed: i64,
        /// Level that would have been reached
        next_level: i64,
    },

    /// The command was used again before its cooldown lapsed.
    #[error("`{command}` is on cooldown. Try again in {retry_after:.1}s.")]
    CommandOnCooldown {
        /// Qualified command name
        command: String,
        /// Seconds until the cooldown lapses
        retry_after: f64,
    },

    /// A guild-bound command was used outside a guild.
    #[error("This command can only be used in a server.")]
    GuildOnly,

    /// Leveling commands were used in a guild that turned leveling off.
    #[error("Leveling isn't enabled on this server.")]
    LevelingDisabled,

    /// Unknown stat name. This is a programming error, not a user condition.
    #[error("Invalid stat field: {name}")]
    InvalidField {
        /// The rejected field name
        name: String,
    },

    /// The caches have not finished warm-start yet.
    #[error("The economy is still starting up, try again in a moment")]
    NotReady,

    /// The durable backend failed to respond or rejected the statement.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] sea_orm::DbErr),

    /// A store write failed and the cache could not be brought back in line with it.
    #[error("Cache and store diverged for {guild_id}/{user_id}: {reason}")]
    Desynchronized {
        /// Guild of the affected account
        guild_id: u64,
        /// User of the affected account
        user_id: u64,
        /// What could not be compensated
        reason: String,
    },

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Serenity/Poise framework error.
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl Error {
    /// Whether the message is meant for the person who invoked the command.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::NotRegistered { .. }
                | Self::InsufficientFunds { .. }
                | Self::InvalidAmount { .. }
                | Self::BadArgument { .. }
                | Self::InsufficientXp { .. }
                | Self::CommandOnCooldown { .. }
                | Self::GuildOnly
                | Self::LevelingDisabled
                | Self::NotReady
        )
    }

    pub(crate) fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount {
            message: message.into(),
        }
    }

    pub(crate) fn bad_argument(message: impl Into<String>) -> Self {
        Self::BadArgument {
            message: message.into(),
        }
    }
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
