//! Welcome Discord commands - configure the message new members receive.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData, guild_id,
            handlers::welcome::{DEFAULT_WELCOME_MESSAGE, WelcomeVars},
        },
        core::cache::WelcomeSettings,
        errors::{Error, Result},
    };
    use poise::serenity_prelude::{self as serenity, Mentionable};

    /// Parent command for welcome messages.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        subcommands(
            "welcome_channel",
            "welcome_dm",
            "welcome_clear",
            "welcome_show",
            "welcome_variables"
        )
    )]
    pub async fn welcome(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Welcome message configuration. Available subcommands:\n\
            `/welcome channel` - Greet new members in a channel\n\
            `/welcome dm` - Greet new members by direct message\n\
            `/welcome clear` - Stop greeting new members\n\
            `/welcome show` - Show the current configuration\n\
            `/welcome variables` - List the placeholders a message can use";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Greets new members in a channel.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        rename = "channel",
        required_permissions = "MANAGE_GUILD"
    )]
    pub async fn welcome_channel(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Channel to post in"] channel: serenity::GuildChannel,
        #[description = "Send the message inside an embed"] embed: Option<bool>,
        #[description = "Message template, e.g. `Welcome ${member.mention}!`"]
        #[rest]
        message: Option<String>,
    ) -> Result<()> {
        let settings = WelcomeSettings {
            message: message.unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string()),
            channel_id: Some(channel.id.get()),
            dm: false,
            embed: embed.unwrap_or(false),
        };
        save(ctx, settings, &format!("in {}", channel.id.mention())).await
    }

    /// Greets new members by direct message.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        rename = "dm",
        required_permissions = "MANAGE_GUILD"
    )]
    pub async fn welcome_dm(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Send the message inside an embed"] embed: Option<bool>,
        #[description = "Message template, e.g. `Welcome to ${server}!`"]
        #[rest]
        message: Option<String>,
    ) -> Result<()> {
        let settings = WelcomeSettings {
            message: message.unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string()),
            channel_id: None,
            dm: true,
            embed: embed.unwrap_or(false),
        };
        save(ctx, settings, "by direct message").await
    }

    /// Stops greeting new members.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        rename = "clear",
        required_permissions = "MANAGE_GUILD"
    )]
    pub async fn welcome_clear(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        ctx.data().economy.guilds.clear_welcome(guild_id).await?;
        ctx.say("Welcome messages are now disabled.").await?;
        Ok(())
    }

    /// Shows the current welcome configuration.
    #[poise::command(slash_command, prefix_command, guild_only, rename = "show")]
    pub async fn welcome_show(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let Some(settings) = ctx.data().economy.guilds.welcome(guild_id).await? else {
            ctx.say("Welcome messages are not set up on this server.")
                .await?;
            return Ok(());
        };

        let target = settings.channel_id.map_or_else(
            || "Direct message".to_string(),
            |id| serenity::ChannelId::new(id).mention().to_string(),
        );
        let embed = serenity::CreateEmbed::default()
            .title("Welcome messages")
            .field("Sent to", target, true)
            .field("Embed", if settings.embed { "Yes" } else { "No" }, true)
            .field("Message", settings.message, false)
            .color(0x0058_65F2);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Lists the placeholders a welcome message can use.
    #[poise::command(slash_command, prefix_command, guild_only, rename = "variables")]
    pub async fn welcome_variables(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let lines = WelcomeVars::DESCRIPTIONS
            .iter()
            .map(|(name, description)| format!("`${{{name}}}` - {description}"))
            .collect::<Vec<_>>()
            .join("\n");

        ctx.say(format!("**Welcome message variables**\n{lines}"))
            .await?;
        Ok(())
    }

    async fn save(
        ctx: poise::Context<'_, BotData, Error>,
        settings: WelcomeSettings,
        target: &str,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        ctx.data()
            .economy
            .guilds
            .set_welcome(guild_id, settings)
            .await?;
        ctx.say(format!("New members will now be welcomed {target}."))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
