//! Block handlers and the registry that dispatches to them.

mod action;
mod assign;
mod control;
mod embed;
mod math;
mod random;
mod text;
mod time;

use std::collections::HashMap;

use tagscript::node::BlockNode;
use tracing::debug;

use crate::error::BlockError;
use crate::runtime::BlockContext;

/// A handler returns the replacement text, or `None` to leave the block's
/// source in place.
pub type Handler = fn(&mut BlockContext<'_>) -> Option<String>;

#[derive(Debug, Clone, Copy)]
pub struct BlockSpec {
    /// Lowercase aliases; the first is the canonical name.
    pub names: &'static [&'static str],
    pub handler: Handler,
}

impl BlockSpec {
    pub fn name(&self) -> &'static str {
        self.names.first().copied().unwrap_or("")
    }

    pub fn will_accept(&self, node: &BlockNode) -> bool {
        node.is_named(self.names)
    }
}

/// Alias-keyed set of blocks. Built up front, then only read.
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    blocks: Vec<BlockSpec>,
    by_name: HashMap<&'static str, usize>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in block.
    pub fn standard() -> Self {
        let mut registry = BlockRegistry::new();
        let groups = [
            control::BLOCKS,
            action::BLOCKS,
            embed::BLOCKS,
            assign::BLOCKS,
            random::BLOCKS,
            math::BLOCKS,
            time::BLOCKS,
            text::BLOCKS,
        ];
        for spec in groups.into_iter().flatten() {
            registry.register(*spec);
        }
        registry
    }

    /// Add a block. An alias already taken is moved to the new block.
    pub fn register(&mut self, spec: BlockSpec) {
        let index = self.blocks.len();
        self.blocks.push(spec);
        for name in spec.names {
            self.by_name.insert(*name, index);
        }
    }

    /// Lookup by alias, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&BlockSpec> {
        let index = match self.by_name.get(name) {
            Some(index) => *index,
            None => *self.by_name.get(name.to_lowercase().as_str())?,
        };
        self.blocks.get(index)
    }

    /// The block that will handle `node`, if any.
    pub fn find(&self, node: &BlockNode) -> Option<&BlockSpec> {
        self.get(&node.declaration)
            .filter(|spec| spec.will_accept(node))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered blocks in registration order, overridden ones skipped.
    pub fn iter(&self) -> impl Iterator<Item = &BlockSpec> {
        self.blocks.iter().enumerate().filter_map(|(index, spec)| {
            spec.names
                .iter()
                .any(|name| self.by_name.get(name) == Some(&index))
                .then_some(spec)
        })
    }
}

/// Truthiness of evaluated text: anything but blank, `false` or `0`.
pub fn is_truthy(text: &str) -> bool {
    let text = text.trim();
    !(text.is_empty() || text.eq_ignore_ascii_case("false") || text == "0")
}

/// Convert a handler-internal failure into "leave the source in place".
pub(crate) fn recover(block: &str, result: Result<String, BlockError>) -> Option<String> {
    match result {
        Ok(output) => Some(output),
        Err(error) => {
            debug!(block, %error, "block failed; keeping source");
            None
        }
    }
}

/// Split a comma/space separated list, dropping blanks.
pub(crate) fn list(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::stub::{self, StubRuntime};

    fn noop(_: &mut BlockContext<'_>) -> Option<String> {
        Some("custom".to_string())
    }

    #[test]
    fn standard_registry_knows_aliases() {
        let registry = BlockRegistry::standard();
        assert_eq!(registry.get("IF").map(BlockSpec::name), Some("if"));
        assert_eq!(registry.get("=").map(BlockSpec::name), Some("var"));
        assert_eq!(registry.get("cmd").map(BlockSpec::name), Some("command"));
        assert!(!registry.contains("python"));
    }

    #[test]
    fn later_registration_takes_alias() {
        let mut registry = BlockRegistry::standard();
        let before = registry.iter().count();
        registry.register(BlockSpec {
            names: &["upper", "shout"],
            handler: noop,
        });
        let upper = registry
            .get("upper")
            .and_then(|spec| stub::call(spec, "{upper}(x)", &mut StubRuntime::default()));
        assert!(registry.contains("shout"));
        assert!(registry.contains("lower"));
        // The old `upper` lost its only alias and is no longer listed.
        assert_eq!(registry.iter().count(), before);
        assert_eq!(upper.as_deref(), Some("custom"));
    }

    #[test]
    fn truthiness() {
        assert!(is_truthy("yes"));
        assert!(is_truthy(" 1 "));
        assert!(!is_truthy(""));
        assert!(!is_truthy("  "));
        assert!(!is_truthy("FALSE"));
        assert!(!is_truthy("0"));
    }

    #[test]
    fn list_splitting() {
        assert_eq!(list("a, b c,,d"), vec!["a", "b", "c", "d"]);
    }
}
