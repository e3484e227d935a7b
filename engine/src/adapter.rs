use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds between the unix epoch and the first Discord snowflake.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// A seed value as seen by templates. `{name}` renders it, `{name.attr}`
/// reads one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Adapter {
    String(String),
    Member(Member),
    Channel(Channel),
    Guild(Guild),
}

impl Adapter {
    pub fn render(&self) -> String {
        match self {
            Adapter::String(text) => text.clone(),
            Adapter::Member(member) => member.display_name().to_string(),
            Adapter::Channel(channel) => channel.name.clone(),
            Adapter::Guild(guild) => guild.name.clone(),
        }
    }

    /// Attribute lookup; `None` for names the adapter does not expose.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let name = name.trim().to_lowercase();
        match self {
            Adapter::String(_) => None,
            Adapter::Member(member) => member.attribute(&name),
            Adapter::Channel(channel) => channel.attribute(&name),
            Adapter::Guild(guild) => guild.attribute(&name),
        }
    }
}

impl From<String> for Adapter {
    fn from(text: String) -> Self {
        Adapter::String(text)
    }
}

impl From<&str> for Adapter {
    fn from(text: &str) -> Self {
        Adapter::String(text.to_string())
    }
}

impl From<Member> for Adapter {
    fn from(member: Member) -> Self {
        Adapter::Member(member)
    }
}

impl From<Channel> for Adapter {
    fn from(channel: Channel) -> Self {
        Adapter::Channel(channel)
    }
}

impl From<Guild> for Adapter {
    fn from(guild: Guild) -> Self {
        Adapter::Guild(guild)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub discriminator: Option<String>,
    /// Top role colour as `0xRRGGBB`.
    #[serde(default)]
    pub color: Option<u32>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl Member {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Member {
            id,
            name: name.into(),
            nick: None,
            discriminator: None,
            color: None,
            avatar: None,
            bot: false,
        }
    }

    pub fn with_nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = Some(nick.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.name)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        let value = match name {
            "id" => self.id.to_string(),
            "name" | "username" => self.name.clone(),
            "nick" | "display_name" | "displayname" => self.display_name().to_string(),
            "mention" => format!("<@{}>", self.id),
            "discriminator" => self.discriminator.clone().unwrap_or_else(|| "0".to_string()),
            "tag" => match self.discriminator.as_deref() {
                Some(discriminator) if discriminator != "0" => {
                    format!("{}#{}", self.name, discriminator)
                }
                _ => self.name.clone(),
            },
            "color" | "colour" => format!("#{:06x}", self.color.unwrap_or(0)),
            "avatar" => self.avatar.clone().unwrap_or_default(),
            "bot" => self.bot.to_string(),
            "created_at" => format_created(self.id)?,
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub nsfw: bool,
}

impl Channel {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Channel {
            id,
            name: name.into(),
            topic: None,
            nsfw: false,
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        let value = match name {
            "id" => self.id.to_string(),
            "name" => self.name.clone(),
            "mention" => format!("<#{}>", self.id),
            "topic" => self.topic.clone().unwrap_or_default(),
            "nsfw" => self.nsfw.to_string(),
            "created_at" => format_created(self.id)?,
            _ => return None,
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub owner_id: Option<u64>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl Guild {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Guild {
            id,
            name: name.into(),
            member_count: 0,
            owner_id: None,
            icon: None,
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        let value = match name {
            "id" => self.id.to_string(),
            "name" => self.name.clone(),
            "member_count" | "members" => self.member_count.to_string(),
            "owner_id" => self.owner_id.map(|id| id.to_string()).unwrap_or_default(),
            "icon" => self.icon.clone().unwrap_or_default(),
            "created_at" => format_created(self.id)?,
            _ => return None,
        };
        Some(value)
    }
}

/// Creation time encoded in a snowflake ID.
pub fn snowflake_time(id: u64) -> Option<DateTime<Utc>> {
    let millis = i64::try_from(id >> 22).ok()?.checked_add(DISCORD_EPOCH_MS)?;
    DateTime::from_timestamp_millis(millis)
}

fn format_created(id: u64) -> Option<String> {
    snowflake_time(id).map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_renders_display_name() {
        let member = Adapter::from(Member::new(1, "alice").with_nick("Ally"));
        assert_eq!(member.render(), "Ally");
        assert_eq!(member.attribute("name").as_deref(), Some("alice"));
        assert_eq!(member.attribute("MENTION").as_deref(), Some("<@1>"));
        assert_eq!(member.attribute("tag").as_deref(), Some("alice"));
        assert_eq!(member.attribute("color").as_deref(), Some("#000000"));
        assert_eq!(member.attribute("nope"), None);
    }

    #[test]
    fn legacy_discriminator_in_tag() {
        let mut member = Member::new(1, "bob");
        member.discriminator = Some("0420".to_string());
        assert_eq!(Adapter::from(member).attribute("tag").as_deref(), Some("bob#0420"));
    }

    #[test]
    fn created_at_comes_from_snowflake() {
        // 2016-04-30 11:18:25.796 UTC
        let created = Adapter::from(Guild::new(175928847299117063, "g")).attribute("created_at");
        assert_eq!(created.as_deref(), Some("2016-04-30 11:18:25 UTC"));
    }

    #[test]
    fn strings_have_no_attributes() {
        assert_eq!(Adapter::from("hi").attribute("len"), None);
    }
}
