//! Account Discord commands - `register`, `unregister`, `balance` and `setpet`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, guild_id},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Registers you into the economy of this server.
    #[poise::command(slash_command, prefix_command, guild_only, aliases("register-account"))]
    pub async fn register(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let registered = ctx
            .data()
            .economy
            .ledger
            .register(guild_id, ctx.author().id.get())
            .await?;

        if registered {
            ctx.say("Registered you into the database.").await?;
        } else {
            ctx.say("You are already registered!").await?;
        }
        Ok(())
    }

    /// Deletes your account on this server. This cannot be undone.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn unregister(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let removed = ctx
            .data()
            .economy
            .ledger
            .unregister(guild_id, ctx.author().id.get())
            .await?;

        if removed {
            ctx.say("Your account has been deleted.").await?;
        } else {
            ctx.say("You are not registered.").await?;
        }
        Ok(())
    }

    /// View yours or someone else's balance.
    #[poise::command(slash_command, prefix_command, guild_only, aliases("bal", "account"))]
    pub async fn balance(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to look up (defaults to you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let user = user.as_ref().unwrap_or_else(|| ctx.author());
        let account = ctx
            .data()
            .economy
            .ledger
            .get_target(guild_id, ctx.author().id.get(), Some(user.id.get()))
            .await?;

        let description = [
            format!("💸 **Cash** → {}", account.cash),
            format!("💰 **Vault** → {}", account.vault),
            format!("🐊 **Pet** → {}", title_case(&account.pet_name)),
            format!("✨ **XP** → {} ({} total)", account.xp, account.total_xp()),
            format!("🥗 **Level** → {}", account.level),
        ]
        .join("\n");

        let embed = serenity::CreateEmbed::default()
            .title(format!("{}'s balance", user.name))
            .description(description)
            .thumbnail(user.face())
            .color(0x0058_65F2);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Renames your pet.
    #[poise::command(slash_command, prefix_command, guild_only, rename = "setpet")]
    pub async fn setpet(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "New name for your pet"]
        #[rest]
        name: String,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let account = ctx
            .data()
            .economy
            .ledger
            .set_pet(guild_id, ctx.author().id.get(), &name)
            .await?;

        ctx.say(format!(
            "🐊 Your pet is now called **{}**.",
            title_case(&account.pet_name)
        ))
        .await?;
        Ok(())
    }

    /// Capitalizes the first letter of every word.
    fn title_case(text: &str) -> String {
        text.split(' ')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// Re-export all commands
pub use inner::*;
