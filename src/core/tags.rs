//! Guild tags - Named snippets of text members can recall later.
//!
//! Tags live only in the store. They are looked up on demand and are not part of warm start.

use crate::{
    core::store::Store,
    entities::{from_db_id, tag, to_db_id},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Longest accepted tag name, in characters.
pub const MAX_TAG_NAME_LEN: usize = 256;

/// Longest accepted tag content, in characters. Matches Discord's message limit.
pub const MAX_TAG_CONTENT_LEN: usize = 2000;

/// A guild tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuildTag {
    /// Guild the tag belongs to
    pub guild_id: u64,
    /// Lowercased name
    pub name: String,
    /// Creator of the tag
    pub owner_id: u64,
    /// Text of the tag
    pub content: String,
    /// Times the tag was shown
    pub uses: i64,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl From<tag::Model> for GuildTag {
    fn from(model: tag::Model) -> Self {
        Self {
            guild_id: from_db_id(model.guild_id),
            name: model.name,
            owner_id: from_db_id(model.owner_id),
            content: model.content,
            uses: model.uses,
            created_at: model.created_at,
        }
    }
}

/// Normalizes a tag name for creation: trimmed and lowercased.
///
/// Rejects empty and overlong names, and names whose first word is in `reserved`.
pub fn normalize_tag_name(input: &str, reserved: &[&str]) -> Result<String> {
    let name = input.trim().to_lowercase();
    if name.is_empty() {
        return Err(Error::bad_argument("Missing tag name."));
    }
    if name.chars().count() > MAX_TAG_NAME_LEN {
        return Err(Error::bad_argument(format!(
            "Tag names can be at most {MAX_TAG_NAME_LEN} characters."
        )));
    }

    let first_word = name.split_whitespace().next().unwrap_or_default();
    if reserved.contains(&first_word) {
        return Err(Error::bad_argument("That tag name is reserved."));
    }
    Ok(name)
}

fn validate_content(content: &str) -> Result<&str> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::bad_argument("A tag needs some content."));
    }
    if content.chars().count() > MAX_TAG_CONTENT_LEN {
        return Err(Error::bad_argument(format!(
            "Tag content can be at most {MAX_TAG_CONTENT_LEN} characters."
        )));
    }
    Ok(content)
}

fn lookup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn not_found(name: &str) -> Error {
    Error::bad_argument(format!("No tag named `{}` exists.", lookup_key(name)))
}

/// Tag operations for every guild.
#[derive(Clone, Debug)]
pub struct TagBook {
    store: Store,
}

impl TagBook {
    /// Creates a tag book persisting through `store`.
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Creates a tag owned by `owner_id`.
    pub async fn create(
        &self,
        guild_id: u64,
        owner_id: u64,
        name: &str,
        content: &str,
        reserved: &[&str],
    ) -> Result<GuildTag> {
        let name = normalize_tag_name(name, reserved)?;
        let content = validate_content(content)?;

        let row = tag::Model {
            guild_id: to_db_id(guild_id),
            name,
            owner_id: to_db_id(owner_id),
            content: content.to_string(),
            uses: 0,
            created_at: Utc::now(),
        };
        if !self.store.insert_tag(row.clone()).await? {
            return Err(Error::bad_argument("A tag with that name already exists."));
        }

        debug!("Created tag `{}` in guild {}", row.name, guild_id);
        Ok(row.into())
    }

    /// A tag without counting it as used.
    pub async fn get(&self, guild_id: u64, name: &str) -> Result<GuildTag> {
        self.store
            .find_tag(guild_id, &lookup_key(name))
            .await?
            .map(GuildTag::from)
            .ok_or_else(|| not_found(name))
    }

    /// A tag, counting it as used.
    pub async fn show(&self, guild_id: u64, name: &str) -> Result<GuildTag> {
        let mut tag = self.get(guild_id, name).await?;
        if self.store.record_tag_use(guild_id, &tag.name).await? == 0 {
            // Deleted between the lookup and the counter update.
            return Err(not_found(name));
        }
        tag.uses += 1;
        Ok(tag)
    }

    /// Replaces the content of a tag owned by `requester`.
    pub async fn edit(
        &self,
        guild_id: u64,
        requester: u64,
        name: &str,
        content: &str,
    ) -> Result<GuildTag> {
        let mut tag = self.get(guild_id, name).await?;
        if tag.owner_id != requester {
            return Err(Error::bad_argument("You don't own that tag."));
        }
        let content = validate_content(content)?;

        if self
            .store
            .set_tag_content(guild_id, &tag.name, content)
            .await?
            == 0
        {
            return Err(not_found(name));
        }
        tag.content = content.to_string();
        Ok(tag)
    }

    /// Deletes a tag. Only its owner may, unless `moderator` is set.
    pub async fn delete(
        &self,
        guild_id: u64,
        requester: u64,
        name: &str,
        moderator: bool,
    ) -> Result<GuildTag> {
        let tag = self.get(guild_id, name).await?;
        if tag.owner_id != requester && !moderator {
            return Err(Error::bad_argument("You don't own that tag."));
        }

        if self.store.delete_tag(guild_id, &tag.name).await? == 0 {
            return Err(not_found(name));
        }
        debug!("Deleted tag `{}` in guild {}", tag.name, guild_id);
        Ok(tag)
    }

    /// Tags created by `owner_id` in a guild, by name.
    pub async fn owned_by(&self, guild_id: u64, owner_id: u64) -> Result<Vec<GuildTag>> {
        Ok(self
            .store
            .tags_by_owner(guild_id, owner_id)
            .await?
            .into_iter()
            .map(GuildTag::from)
            .collect())
    }
}
