use chrono::{DateTime, Utc};
use tagscript::Template;
use tagscript::parser::Parser;
use tracing::debug_span;

use crate::block::BlockRegistry;
use crate::config::Limits;
use crate::evaluator::Evaluator;
use crate::response::Response;
use crate::seed::Seed;

/// Parses and evaluates templates. Immutable once built, so one instance can
/// serve concurrent calls; each call owns its own state.
#[derive(Debug, Clone)]
pub struct Interpreter {
    registry: BlockRegistry,
    limits: Limits,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl Interpreter {
    pub fn new(limits: Limits) -> Self {
        Self::with_registry(BlockRegistry::standard(), limits)
    }

    pub fn with_registry(registry: BlockRegistry, limits: Limits) -> Self {
        Interpreter { registry, limits }
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Parse with this interpreter's depth limit.
    pub fn parse(&self, source: &str) -> Template {
        Parser::new(source.to_string(), 0)
            .with_max_depth(self.limits.max_depth)
            .parse()
    }

    /// Parse and evaluate. Never fails: anything malformed stays literal
    /// text and exhausted limits set `Response::truncated`.
    pub fn process(&self, source: &str, seed: &Seed) -> Response {
        self.process_template(&self.parse(source), seed)
    }

    pub fn process_template(&self, template: &Template, seed: &Seed) -> Response {
        self.process_at(template, seed, Utc::now())
    }

    /// Evaluate with a fixed "now" for `strf`, `unix` and embed timestamps.
    pub fn process_at(&self, template: &Template, seed: &Seed, now: DateTime<Utc>) -> Response {
        let span = debug_span!("process", source_len = template.source.len());
        let _enter = span.enter();
        Evaluator::new(template, &self.registry, &self.limits, seed, now).run()
    }
}
