use std::path::PathBuf;

use thiserror::Error;

use crate::math::MathError;

/// Failure inside a block handler. Never escapes `process`: the handler
/// boundary turns it into a literal re-emission of the block source.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("invalid {what}: '{value}'")]
    Invalid { what: &'static str, value: String },
    #[error(transparent)]
    Math(#[from] MathError),
    #[error("invalid embed JSON: {0}")]
    EmbedJson(#[from] serde_json::Error),
    #[error("time pattern could not be formatted")]
    Format(#[from] std::fmt::Error),
}

impl BlockError {
    pub(crate) fn invalid(what: &'static str, value: impl Into<String>) -> Self {
        BlockError::Invalid {
            what,
            value: value.into(),
        }
    }
}

/// Failure reading a seed or limits file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in '{}': {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
