//! Welcome messages for new members.
//!
//! Templates use `${variable}` placeholders; see [`WelcomeVars::DESCRIPTIONS`].

use crate::{
    bot::BotData,
    errors::Result,
};
use poise::serenity_prelude::{self as serenity, Mentionable};

/// Default template offered when setting up welcome messages.
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Welcome ${member.name} to ${server}! You are member ${server.member_count}.";

/// Values substituted into a welcome template.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WelcomeVars {
    /// Member's display tag
    pub member: String,
    /// Member's user name
    pub member_name: String,
    /// Mention of the member
    pub member_mention: String,
    /// Server name
    pub server: String,
    /// Members in the server
    pub member_count: u64,
}

impl WelcomeVars {
    /// Every placeholder with a short description.
    pub const DESCRIPTIONS: [(&'static str, &'static str); 5] = [
        ("member", "The member's tag"),
        ("member.name", "The member's name"),
        ("member.mention", "Mentions the member"),
        ("server", "The server's name"),
        ("server.member_count", "The number of members in the server"),
    ];

    /// Builds the values for `member` joining a guild named `server`.
    #[must_use]
    pub fn for_member(member: &serenity::Member, server: String, member_count: u64) -> Self {
        Self {
            member: member.user.tag(),
            member_name: member.user.name.clone(),
            member_mention: member.mention().to_string(),
            server,
            member_count,
        }
    }

    /// Substitutes every known placeholder in `template`. Unknown placeholders are kept.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        let count = self.member_count.to_string();
        [
            ("member", self.member.as_str()),
            ("member.name", self.member_name.as_str()),
            ("member.mention", self.member_mention.as_str()),
            ("server", self.server.as_str()),
            ("server.member_count", count.as_str()),
        ]
        .into_iter()
        .fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("${{{name}}}"), value)
        })
    }
}

/// Sends the guild's welcome message for a member who just joined.
pub async fn greet(
    ctx: &serenity::Context,
    member: &serenity::Member,
    data: &BotData,
) -> Result<()> {
    if member.user.bot {
        return Ok(());
    }
    let Some(settings) = data.economy.guilds.welcome(member.guild_id.get()).await? else {
        return Ok(());
    };

    let (server, member_count) = ctx
        .cache
        .guild(member.guild_id)
        .map(|guild| (guild.name.clone(), guild.member_count))
        .unwrap_or_default();
    let text = WelcomeVars::for_member(member, server, member_count).render(&settings.message);

    let message = if settings.embed {
        serenity::CreateMessage::new().embed(
            serenity::CreateEmbed::default()
                .description(text)
                .color(0x0058_65F2),
        )
    } else {
        serenity::CreateMessage::new().content(text)
    };

    if settings.dm {
        member.user.direct_message(ctx, message).await?;
    } else if let Some(channel_id) = settings.channel_id {
        serenity::ChannelId::new(channel_id)
            .send_message(ctx, message)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_known_placeholders() {
        let vars = WelcomeVars {
            member: "croc#0001".to_string(),
            member_name: "croc".to_string(),
            member_mention: "<@42>".to_string(),
            server: "Swamp".to_string(),
            member_count: 17,
        };

        assert_eq!(
            vars.render(DEFAULT_WELCOME_MESSAGE),
            "Welcome croc to Swamp! You are member 17."
        );
        assert_eq!(
            vars.render("Hi ${member.mention} (${member}) ${unknown}"),
            "Hi <@42> (croc#0001) ${unknown}"
        );
    }
}
