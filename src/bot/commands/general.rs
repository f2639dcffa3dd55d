//! General Discord commands - ping and help.
//! These commands do not touch the economy.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let prefix = &ctx.data().settings.bot.prefix;
        let help_text = format!(
            "**Mao Help**\n\
            Commands work as slash commands or with the `{prefix}` prefix.\n\n\
            **Account**\n\
            • `register` / `unregister` - Create or delete your account on this server.\n\
            • `balance [user]` - Shows cash, vault, pet, XP and level.\n\
            • `setpet <name>` - Renames your pet.\n\n\
            **Money**\n\
            • `withdraw <amount>` / `deposit <amount>` - Move money between cash and vault. \
            Amounts can be a number, a percentage, `half` or `all`.\n\
            • `work` - Earn some cash (every 5 minutes).\n\
            • `daily` - Collect your daily reward, boosted by your level.\n\
            • `leaderboard [kind] [page]` - The richest (or highest level) members.\n\n\
            **Leveling**\n\
            • `level [user]` - Shows level progress.\n\
            • `level-up` - Spend XP to reach the next level.\n\
            • `toggle-leveling` - Turn leveling on or off (Manage Server).\n\n\
            **Welcome**\n\
            • `welcome channel|dm|clear|show|variables` - Configure welcome messages (Manage Server).\n\n\
            **Tags**\n\
            • `tag <name>` - Shows a tag.\n\
            • `tag create|edit|delete|info|list` - Manage tags. Moderators may delete any tag.\n\n\
            **Utility**\n\
            • `ping` - Checks if the bot is responsive.\n\
            • `help` - Shows this help message."
        );

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
