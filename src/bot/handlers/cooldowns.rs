//! Command cooldowns: checked before a command runs, started after it succeeds.

use crate::{
    bot::BotData,
    core::cooldown::{CommandCooldown, CooldownKey, epoch_now},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use tracing::error;

/// Cooldown rule of a command, by qualified name.
#[must_use]
pub fn cooldown_for(command: &str) -> Option<CommandCooldown> {
    let (rate, guild) = match command {
        "work" => (300.0, true),
        "daily" => (86_400.0, true),
        "balance" => (2.0, false),
        "leaderboard" | "level" => (5.0, false),
        "tag" | "tag show" => (2.0, false),
        _ => return None,
    };
    Some(CommandCooldown { rate, guild })
}

fn cooldown_key(ctx: poise::Context<'_, BotData, Error>) -> Option<(CooldownKey, CommandCooldown)> {
    let command = &ctx.command().qualified_name;
    let rule = cooldown_for(command)?;
    let key = CooldownKey::for_command(
        rule,
        ctx.guild_id().map(serenity::GuildId::get),
        ctx.author().id.get(),
        command,
    )?;
    Some((key, rule))
}

/// Rejects the invocation with `CommandOnCooldown` while its cooldown is live.
pub async fn command_check(ctx: poise::Context<'_, BotData, Error>) -> Result<bool> {
    let Some((key, _)) = cooldown_key(ctx) else {
        return Ok(true);
    };

    match ctx.data().economy.cooldowns.check(&key, epoch_now()).await? {
        Some(retry_after) => Err(Error::CommandOnCooldown {
            command: key.command,
            retry_after,
        }),
        None => Ok(true),
    }
}

/// Starts the cooldown of a command that completed successfully.
pub async fn post_command(ctx: poise::Context<'_, BotData, Error>) {
    let Some((key, rule)) = cooldown_key(ctx) else {
        return;
    };

    if let Err(e) = ctx.data().economy.cooldowns.start(key, rule).await {
        error!(
            "Failed to store cooldown for `{}`: {}",
            ctx.command().qualified_name,
            e
        );
    }
}
