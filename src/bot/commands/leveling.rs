//! Leveling Discord commands - `level`, `level-up`, `leaderboard` and `toggle-leveling`.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, guild_id},
        core::ledger::{LeaderboardKind, LeaderboardPage},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Ordering offered by the leaderboard command.
    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum LeaderboardChoice {
        #[name = "total"]
        Total,
        #[name = "cash"]
        Cash,
        #[name = "vault"]
        Vault,
        #[name = "level"]
        Level,
    }

    impl From<LeaderboardChoice> for LeaderboardKind {
        fn from(choice: LeaderboardChoice) -> Self {
            match choice {
                LeaderboardChoice::Total => Self::Total,
                LeaderboardChoice::Cash => Self::Cash,
                LeaderboardChoice::Vault => Self::Vault,
                LeaderboardChoice::Level => Self::Level,
            }
        }
    }

    async fn require_leveling(ctx: poise::Context<'_, BotData, Error>, guild_id: u64) -> Result<()> {
        if ctx.data().economy.guilds.is_leveling_enabled(guild_id).await? {
            Ok(())
        } else {
            Err(Error::LevelingDisabled)
        }
    }

    /// View a member's level on this server.
    #[poise::command(slash_command, prefix_command, guild_only, aliases("xp", "lvl", "profile"))]
    pub async fn level(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to look up (defaults to you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        require_leveling(ctx, guild_id).await?;

        let user = user.as_ref().unwrap_or_else(|| ctx.author());
        let account = ctx
            .data()
            .economy
            .ledger
            .get_target(guild_id, ctx.author().id.get(), Some(user.id.get()))
            .await?;

        let embed = serenity::CreateEmbed::default()
            .title(format!("{}'s level", user.name))
            .field("Level", account.level.to_string(), true)
            .field(
                "XP",
                format!("{} / {}", account.xp, account.next_level_xp()),
                true,
            )
            .field("Total XP", account.total_xp().to_string(), true)
            .thumbnail(user.face())
            .color(0x0058_65F2);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Spend XP to reach the next level.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        rename = "level-up",
        aliases("lvlup", "levelup")
    )]
    pub async fn level_up(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        require_leveling(ctx, guild_id).await?;

        let account = ctx
            .data()
            .economy
            .ledger
            .level_up(guild_id, ctx.author().id.get())
            .await?;

        ctx.say(format!("Leveled you up to level {}!", account.level))
            .await?;
        Ok(())
    }

    /// The richest members of this server.
    #[poise::command(slash_command, prefix_command, guild_only, aliases("lb", "top"))]
    pub async fn leaderboard(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "What to rank by"] kind: Option<LeaderboardChoice>,
        #[description = "Page number"] page: Option<usize>,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let kind = kind.map_or_else(LeaderboardKind::default, Into::into);
        let board = ctx
            .data()
            .economy
            .ledger
            .leaderboard(guild_id, kind, page.unwrap_or(1))
            .await?;

        let embed = serenity::CreateEmbed::default()
            .title(title(kind))
            .description(render_lines(&board))
            .footer(serenity::CreateEmbedFooter::new(format!(
                "Page {}/{}",
                board.page, board.max_pages
            )))
            .color(0x0058_65F2);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Enables or disables leveling on this server.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        rename = "toggle-leveling",
        aliases("toggleleveling", "toggle_leveling"),
        required_permissions = "MANAGE_GUILD"
    )]
    pub async fn toggle_leveling(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let enabled = ctx.data().economy.guilds.toggle_leveling(guild_id).await?;

        let state = if enabled { "Enabled" } else { "Disabled" };
        ctx.say(format!("{state} leveling on this server.")).await?;
        Ok(())
    }

    const fn title(kind: LeaderboardKind) -> &'static str {
        match kind {
            LeaderboardKind::Total => "Leaderboard - Net worth",
            LeaderboardKind::Cash => "Leaderboard - Cash",
            LeaderboardKind::Vault => "Leaderboard - Vault",
            LeaderboardKind::Level => "Leaderboard - Level",
        }
    }

    fn render_lines(board: &LeaderboardPage) -> String {
        if board.entries.is_empty() {
            return "Nobody here is registered yet.".to_string();
        }

        board
            .entries
            .iter()
            .map(|entry| match board.kind {
                LeaderboardKind::Level => format!(
                    "**{}.** <@{}> » Level: **{}** Total XP: **{}**",
                    entry.rank, entry.user_id, entry.level, entry.value
                ),
                _ => format!(
                    "**{}.** <@{}> » **${}**",
                    entry.rank, entry.user_id, entry.value
                ),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// Re-export all commands
pub use inner::*;
