use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Structured result of one `process` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    /// `None` exactly when evaluation produced no text.
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<EmbedSpec>,
    pub actions: Actions,
    /// Variables resolved during evaluation, attached by `{debug}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<BTreeMap<String, String>>,
    /// A resource limit stopped evaluation early.
    pub truncated: bool,
}

/// Side effects requested by a template. The interpreter records them; the
/// caller decides whether to act.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Actions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Overrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires: Option<Check>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<Check>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<Cooldown>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub embed: bool,
    #[serde(rename = "react", skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

impl Actions {
    /// Names of the actions that are present, in a fixed order.
    pub fn keys(&self) -> Vec<&'static str> {
        let present = [
            ("delete", self.delete.is_some()),
            ("target", self.target.is_some()),
            ("override", self.overrides.is_some()),
            ("requires", self.requires.is_some()),
            ("blacklist", self.blacklist.is_some()),
            ("cooldown", self.cooldown.is_some()),
            ("embed", self.embed),
            ("react", !self.reactions.is_empty()),
            ("commands", !self.commands.is_empty()),
        ];
        present
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(key, _)| key)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

/// Where the reply goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Dm,
    Reply,
    /// A channel reference as written: mention, ID or name.
    Channel(String),
}

impl Target {
    pub fn parse(text: &str) -> Option<Target> {
        let text = text.trim();
        match text.to_lowercase().as_str() {
            "" => None,
            "dm" => Some(Target::Dm),
            "reply" => Some(Target::Reply),
            _ => Some(Target::Channel(text.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Dm => write!(f, "dm"),
            Target::Reply => write!(f, "reply"),
            Target::Channel(channel) => write!(f, "{}", channel),
        }
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A role/channel/member list with the message to send when it fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Check {
    pub items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Overrides {
    pub admin: bool,
    pub moderator: bool,
    pub permissions: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cooldown {
    /// Uses allowed per window.
    pub rate: u32,
    pub per_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A platform-neutral embed description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl EmbedSpec {
    pub fn is_empty(&self) -> bool {
        *self == EmbedSpec::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_present_actions() {
        let mut actions = Actions::default();
        assert!(actions.is_empty());
        actions.delete = Some(false);
        actions.reactions.push("👍".to_string());
        actions.target = Target::parse("DM");
        assert_eq!(actions.keys(), vec!["delete", "target", "react"]);
    }

    #[test]
    fn target_parsing() {
        assert_eq!(Target::parse(" reply "), Some(Target::Reply));
        assert_eq!(Target::parse("<#123>"), Some(Target::Channel("<#123>".to_string())));
        assert_eq!(Target::parse("  "), None);
    }

    #[test]
    fn response_json_skips_absent_fields() {
        let mut response = Response {
            body: Some("hi".to_string()),
            ..Response::default()
        };
        response.actions.target = Some(Target::Dm);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "body": "hi",
                "actions": { "target": "dm" },
                "truncated": false,
            })
        );
    }
}
