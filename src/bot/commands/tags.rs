//! Tag Discord commands - create, recall, edit and delete guild tags.

/// Subcommand names. A tag name may not start with one of these.
pub const TAG_SUBCOMMANDS: &[&str] = &["create", "show", "edit", "delete", "info", "list"];

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use super::TAG_SUBCOMMANDS;
    use crate::{
        bot::{BotData, guild_id},
        errors::{Error, Result},
    };
    use poise::serenity_prelude::{self as serenity, Mentionable};

    /// Shows a tag, or lists the tag subcommands when no name is given.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        subcommands(
            "tag_create",
            "tag_show",
            "tag_edit",
            "tag_delete",
            "tag_info",
            "tag_list"
        )
    )]
    pub async fn tag(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Tag to show"]
        #[rest]
        name: Option<String>,
    ) -> Result<()> {
        if let Some(name) = name {
            return send_tag(ctx, &name).await;
        }

        let help_text = "Tags are named snippets of text. Available subcommands:\n\
            `/tag create <name> <content>` - Create a tag\n\
            `/tag show <name>` - Show a tag\n\
            `/tag edit <name> <content>` - Replace the content of your tag\n\
            `/tag delete <name>` - Delete your tag\n\
            `/tag info <name>` - Show who owns a tag and how often it was used\n\
            `/tag list [user]` - List the tags someone created";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a tag. Multi-word names need quotes with the prefix form.
    #[poise::command(slash_command, prefix_command, guild_only, rename = "create")]
    pub async fn tag_create(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Name of the tag"] name: String,
        #[description = "Text the tag shows"]
        #[rest]
        content: String,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let tag = ctx
            .data()
            .economy
            .tags
            .create(
                guild_id,
                ctx.author().id.get(),
                &name,
                &content,
                TAG_SUBCOMMANDS,
            )
            .await?;

        ctx.say(format!("Tag `{}` created.", tag.name)).await?;
        Ok(())
    }

    /// Shows a tag.
    #[poise::command(slash_command, prefix_command, guild_only, rename = "show")]
    pub async fn tag_show(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Tag to show"]
        #[rest]
        name: String,
    ) -> Result<()> {
        send_tag(ctx, &name).await
    }

    /// Replaces the content of a tag you own.
    #[poise::command(slash_command, prefix_command, guild_only, rename = "edit")]
    pub async fn tag_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Tag to edit"] name: String,
        #[description = "New text"]
        #[rest]
        content: String,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let tag = ctx
            .data()
            .economy
            .tags
            .edit(guild_id, ctx.author().id.get(), &name, &content)
            .await?;

        ctx.say(format!("Tag `{}` updated.", tag.name)).await?;
        Ok(())
    }

    /// Deletes a tag you own. Members with Manage Server may delete any tag.
    #[poise::command(slash_command, prefix_command, guild_only, rename = "delete")]
    pub async fn tag_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Tag to delete"]
        #[rest]
        name: String,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let moderator = can_manage_guild(ctx).await;
        let tag = ctx
            .data()
            .economy
            .tags
            .delete(guild_id, ctx.author().id.get(), &name, moderator)
            .await?;

        ctx.say(format!("Tag `{}` deleted.", tag.name)).await?;
        Ok(())
    }

    /// Shows who owns a tag and how often it was used.
    #[poise::command(slash_command, prefix_command, guild_only, rename = "info")]
    pub async fn tag_info(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Tag to look up"]
        #[rest]
        name: String,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let tag = ctx.data().economy.tags.get(guild_id, &name).await?;

        let embed = serenity::CreateEmbed::default()
            .title(&tag.name)
            .field(
                "Owner",
                serenity::UserId::new(tag.owner_id).mention().to_string(),
                true,
            )
            .field("Uses", tag.uses.to_string(), true)
            .field(
                "Created",
                tag.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                true,
            )
            .color(0x0058_65F2);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Lists the tags a member created on this server.
    #[poise::command(slash_command, prefix_command, guild_only, rename = "list")]
    pub async fn tag_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member whose tags to list (defaults to you)"] user: Option<
            serenity::User,
        >,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let user = user.as_ref().unwrap_or_else(|| ctx.author());
        let tags = ctx
            .data()
            .economy
            .tags
            .owned_by(guild_id, user.id.get())
            .await?;

        if tags.is_empty() {
            ctx.say(format!("{} has no tags.", user.name)).await?;
            return Ok(());
        }

        let lines = tags
            .iter()
            .enumerate()
            .map(|(index, tag)| format!("{}. `{}` ({} uses)", index + 1, tag.name, tag.uses))
            .collect::<Vec<_>>()
            .join("\n");
        let embed = serenity::CreateEmbed::default()
            .title(format!("{}'s tags", user.name))
            .description(lines)
            .color(0x0058_65F2);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    async fn send_tag(ctx: poise::Context<'_, BotData, Error>, name: &str) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let tag = ctx.data().economy.tags.show(guild_id, name).await?;
        ctx.say(tag.content).await?;
        Ok(())
    }

    async fn can_manage_guild(ctx: poise::Context<'_, BotData, Error>) -> bool {
        let Some(member) = ctx.author_member().await else {
            return false;
        };
        ctx.guild()
            .is_some_and(|guild| guild.member_permissions(&member).manage_guild())
    }
}

// Re-export all commands
pub use inner::*;
