use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::adapter::{Adapter, Channel, Guild, Member};
use crate::error::LoadError;

/// Built-in seed names. Reserved even when absent, as `server` is in DMs.
pub const BUILTIN_NAMES: &[&str] = &["user", "target", "channel", "server", "args"];

/// Variables supplied by the caller for one evaluation.
///
/// Names are case-insensitive. Every name present here is reserved: `{var}`
/// cannot shadow it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Seed {
    entries: HashMap<String, Adapter>,
}

impl Seed {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard seed for a tag invocation. `target` falls back to the
    /// invoking user; `server` is absent in direct messages.
    pub fn for_invocation(
        user: Member,
        target: Option<Member>,
        channel: Channel,
        server: Option<Guild>,
        args: impl Into<String>,
    ) -> Self {
        let target = target.unwrap_or_else(|| user.clone());
        let mut seed = Seed::new()
            .with("user", user)
            .with("target", target)
            .with("channel", channel)
            .with("args", args.into());
        if let Some(server) = server {
            seed.insert("server", server);
        }
        seed
    }

    pub fn with(mut self, name: &str, value: impl Into<Adapter>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Adapter>) {
        self.entries.insert(name.trim().to_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Adapter> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Whether `{var}` must leave `name` alone.
    pub fn is_reserved(&self, name: &str) -> bool {
        BUILTIN_NAMES.contains(&name) || self.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a seed from a TOML [`SeedFile`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        SeedFile::load(path).map(SeedFile::into_seed)
    }
}

/// On-disk form of a seed, used by the CLI and tag tests.
///
/// ```toml
/// args = "hello world"
///
/// [user]
/// id = 80351110224678912
/// name = "nelly"
///
/// [channel]
/// id = 81384788765712384
/// name = "general"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedFile {
    pub user: Option<Member>,
    pub target: Option<Member>,
    pub channel: Option<Channel>,
    pub server: Option<Guild>,
    pub args: String,
    /// Extra string entries, reserved like the built-ins.
    pub variables: BTreeMap<String, String>,
}

impl SeedFile {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source).map_err(|source| LoadError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn into_seed(self) -> Seed {
        let mut seed = Seed::new();
        for (name, value) in self.variables {
            seed.insert(&name, value);
        }
        let target = self.target.or_else(|| self.user.clone());
        if let Some(user) = self.user {
            seed.insert("user", user);
        }
        if let Some(target) = target {
            seed.insert("target", target);
        }
        if let Some(channel) = self.channel {
            seed.insert("channel", channel);
        }
        if let Some(server) = self.server {
            seed.insert("server", server);
        }
        seed.insert("args", self.args);
        seed
    }
}
