//! Gateway event handler.

use crate::{
    bot::{BotData, handlers::welcome},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::time::Instant;
use tracing::{debug, trace};

/// Dispatches the gateway events the economy cares about.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            award_message_xp(new_message, data).await?;
        }
        serenity::FullEvent::GuildCreate { guild, .. } => {
            data.economy.guilds.join_guild(guild.id.get()).await?;
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            // An unavailable guild is an outage, not a removal.
            if incomplete.unavailable {
                debug!("Guild {} became unavailable", incomplete.id);
            } else {
                data.economy.guilds.leave_guild(incomplete.id.get()).await?;
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            welcome::greet(ctx, new_member, data).await?;
        }
        _ => {}
    }
    Ok(())
}

/// Awards XP for a message when its author is eligible.
///
/// Bot authors, DMs, guilds with leveling off, unregistered members and throttled members
/// earn nothing.
async fn award_message_xp(message: &serenity::Message, data: &BotData) -> Result<()> {
    if message.author.bot {
        return Ok(());
    }
    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    let (guild_id, user_id) = (guild_id.get(), message.author.id.get());

    let economy = &data.economy;
    if !economy.guilds.is_leveling_enabled(guild_id).await?
        || !economy.ledger.is_registered(guild_id, user_id).await?
    {
        return Ok(());
    }
    if !data.xp_throttle.allow(guild_id, user_id, Instant::now()).await {
        return Ok(());
    }

    let award = data.xp_award();
    match economy.xp.record(guild_id, user_id, award).await {
        Ok(()) => {
            trace!("Awarded {} XP to {}/{}", award, guild_id, user_id);
            Ok(())
        }
        // Unregistered between the check and the award.
        Err(Error::NotRegistered { .. }) => Ok(()),
        Err(e) => Err(e),
    }
}
