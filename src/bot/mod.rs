//! Bot layer - Discord-specific interface and command handlers
//!
//! Commands and event handlers translate Discord interactions into calls on the shared
//! [`Economy`] and format the plain data it returns.

/// Discord command implementations (account, bank, leveling, welcome, general)
pub mod commands;
/// Discord event, cooldown and error handlers
pub mod handlers;

use crate::{
    config::Settings,
    core::Economy,
    errors::{Error, Result},
};
use handlers::throttle::XpThrottle;
use poise::serenity_prelude as serenity;
use rand::Rng;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Shared data available to all bot commands.
pub struct BotData {
    /// The economy every command operates on
    pub economy: Arc<Economy>,
    /// Application settings
    pub settings: Settings,
    /// Per-member limit on XP awards
    pub xp_throttle: XpThrottle,
}

impl BotData {
    /// Creates the shared context for all commands.
    #[must_use]
    pub fn new(economy: Arc<Economy>, settings: Settings) -> Self {
        let xp_throttle = XpThrottle::new(
            settings.economy.xp_throttle_messages,
            settings.economy.xp_throttle_window(),
        );
        Self {
            economy,
            settings,
            xp_throttle,
        }
    }

    /// A random XP award within the configured range.
    #[must_use]
    pub fn xp_award(&self) -> i64 {
        let economy = &self.settings.economy;
        rand::rng().random_range(economy.xp_award_min..=economy.xp_award_max)
    }
}

/// Guild of the invocation, for commands that only make sense inside one.
pub fn guild_id(ctx: poise::Context<'_, BotData, Error>) -> Result<u64> {
    ctx.guild_id().map(serenity::GuildId::get).ok_or(Error::GuildOnly)
}

async fn reply_with_error(ctx: poise::Context<'_, BotData, Error>, error: Error) {
    let message = if error.is_user_facing() {
        error.to_string()
    } else {
        error!(
            "Error in command `{}`: {}",
            ctx.command().qualified_name,
            error
        );
        "Something went wrong on our side, please try again later.".to_string()
    };

    if let Err(e) = ctx.say(message).await {
        error!("Failed to send error message: {}", e);
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. }
        | poise::FrameworkError::CommandCheckFailed {
            error: Some(error),
            ctx,
            ..
        } => reply_with_error(ctx, error).await,
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Connects to Discord and runs until the gateway connection ends.
#[instrument(skip_all)]
pub async fn run_bot(token: String, economy: Arc<Economy>, settings: Settings) -> Result<()> {
    let prefix = settings.bot.prefix.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                case_insensitive_commands: true,
                ..Default::default()
            },
            on_error: |error| Box::pin(on_error(error)),
            command_check: Some(|ctx| Box::pin(handlers::cooldowns::command_check(ctx))),
            post_command: |ctx| Box::pin(handlers::cooldowns::post_command(ctx)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::events::event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let added = economy
                    .guilds
                    .ensure_guilds(ready.guilds.iter().map(|guild| guild.id.get()))
                    .await?;
                info!("Serving {} guilds ({} new)", ready.guilds.len(), added);

                Ok(BotData::new(economy, settings))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MEMBERS;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot client...");
    client.start().await?;
    Ok(())
}
