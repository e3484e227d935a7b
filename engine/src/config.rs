use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Resource bounds applied to a single `process` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Parse nesting limit and evaluation recursion limit.
    pub max_depth: usize,
    /// Total evaluated nodes, text and block alike.
    pub max_nodes: usize,
    pub time_budget_ms: u64,
    /// Total bytes emitted across every evaluated fragment.
    pub max_output_bytes: usize,
    pub max_embeds: usize,
    pub max_reactions: usize,
    pub max_commands: usize,
    /// Fixes the random generator so `random`, `50` and `range` replay.
    pub rng_seed: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_depth: tagscript::parser::DEFAULT_MAX_DEPTH,
            max_nodes: 1000,
            time_budget_ms: 50,
            max_output_bytes: 64 * 1024,
            max_embeds: 10,
            max_reactions: 5,
            max_commands: 3,
            rng_seed: None,
        }
    }
}

impl Limits {
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Read limits from a TOML file. Missing keys keep their defaults.
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
}
