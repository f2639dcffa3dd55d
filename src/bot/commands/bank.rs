//! Money Discord commands - `withdraw`, `deposit`, `work` and `daily`.
//!
//! Amounts are typed as text and resolved against the balance being drawn from, so
//! `withdraw half` means half of the vault and `deposit 30%` means 30% of cash.

/// Base daily reward.
pub const DAILY_BASE: i64 = 500;

/// Daily reward for an account at `level`: the base plus 2% per level.
#[must_use]
pub const fn daily_payout(level: i64) -> i64 {
    DAILY_BASE.saturating_add(level.saturating_mul(DAILY_BASE * 2) / 100)
}

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use super::{DAILY_BASE, daily_payout};
    use crate::{
        bot::{BotData, guild_id},
        core::{amount::parse_amount, ledger::StatField},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use rand::Rng;

    async fn reply(ctx: poise::Context<'_, BotData, Error>, description: String) -> Result<()> {
        let embed = serenity::CreateEmbed::default()
            .description(description)
            .color(0x0058_65F2);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Withdraw money from your vault.
    #[poise::command(slash_command, prefix_command, guild_only, aliases("wd", "with"))]
    pub async fn withdraw(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount: a number, a percentage, `half` or `all`"] amount: String,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let user_id = ctx.author().id.get();
        let ledger = &ctx.data().economy.ledger;

        let account = ledger.get(guild_id, user_id).await?;
        let amount = parse_amount(&amount, account.vault)?;
        ledger.withdraw(guild_id, user_id, amount).await?;

        reply(ctx, format!("You withdraw **${amount}** from your vault.")).await
    }

    /// Deposit money into your vault.
    #[poise::command(slash_command, prefix_command, guild_only, aliases("dep"))]
    pub async fn deposit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount: a number, a percentage, `half` or `all`"] amount: String,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let user_id = ctx.author().id.get();
        let ledger = &ctx.data().economy.ledger;

        let account = ledger.get(guild_id, user_id).await?;
        let amount = parse_amount(&amount, account.cash)?;
        ledger.deposit(guild_id, user_id, amount).await?;

        reply(ctx, format!("You deposit **${amount}** to your vault.")).await
    }

    /// Work for a little bit of money.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn work(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let amount = rand::rng().random_range(170..=567);
        ctx.data()
            .economy
            .ledger
            .edit_stat(guild_id, ctx.author().id.get(), StatField::Cash, amount)
            .await?;

        reply(
            ctx,
            format!("You put in a shift and earn **${amount}**. Come back in five minutes."),
        )
        .await
    }

    /// Collect money daily.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn daily(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let user_id = ctx.author().id.get();
        let ledger = &ctx.data().economy.ledger;

        let level = ledger.get(guild_id, user_id).await?.level;
        let payout = daily_payout(level);
        ledger
            .edit_stat(guild_id, user_id, StatField::Cash, payout)
            .await?;

        reply(
            ctx,
            format!(
                "You collect **${DAILY_BASE}**. Because you are level {level}, you earn an extra **${}**",
                payout - DAILY_BASE
            ),
        )
        .await
    }
}

// Re-export all commands
pub use inner::*;
