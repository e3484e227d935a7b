use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tagscript::Template;
use tagscript::node::{BlockNode, Node};
use tracing::{debug, trace, warn};

use crate::block::BlockRegistry;
use crate::config::Limits;
use crate::resolver;
use crate::response::Response;
use crate::runtime::{BlockContext, Runtime};
use crate::seed::Seed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Limit {
    Depth,
    Nodes,
    Time,
    Output,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Depth => write!(f, "max_depth"),
            Limit::Nodes => write!(f, "max_nodes"),
            Limit::Time => write!(f, "time_budget_ms"),
            Limit::Output => write!(f, "max_output_bytes"),
        }
    }
}

/// State of a single `process` call.
pub(crate) struct Evaluator<'a> {
    template: &'a Template,
    registry: &'a BlockRegistry,
    limits: &'a Limits,
    seed: &'a Seed,
    /// `{var}` bindings. The seed itself is never written.
    overlay: HashMap<String, String>,
    response: Response,
    /// Every successful variable resolution, for `{debug}`.
    resolved: BTreeMap<String, String>,
    debug: bool,
    depth: usize,
    visited: usize,
    emitted: usize,
    started: Instant,
    now: DateTime<Utc>,
    rng: StdRng,
    halted: Option<String>,
    truncated: Option<Limit>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(
        template: &'a Template,
        registry: &'a BlockRegistry,
        limits: &'a Limits,
        seed: &'a Seed,
        now: DateTime<Utc>,
    ) -> Self {
        let rng = match limits.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Evaluator {
            template,
            registry,
            limits,
            seed,
            overlay: HashMap::new(),
            response: Response::default(),
            resolved: BTreeMap::new(),
            debug: false,
            depth: 0,
            visited: 0,
            emitted: 0,
            started: Instant::now(),
            now,
            rng,
            halted: None,
            truncated: None,
        }
    }

    /// Evaluate the whole template and assemble the response.
    pub(crate) fn run(mut self) -> Response {
        let template = self.template;
        let body = self.evaluate_nodes(&template.nodes);
        let body = self.halted.take().unwrap_or(body);

        let mut response = self.response;
        response.body = (!body.is_empty()).then_some(body);
        response.truncated = self.truncated.is_some();
        if self.debug {
            response.debug = Some(self.resolved);
        }
        response
    }

    fn stopped(&self) -> bool {
        self.halted.is_some() || self.truncated.is_some()
    }

    fn truncate(&mut self, limit: Limit) {
        if self.truncated.is_none() {
            warn!(%limit, nodes = self.visited, "evaluation truncated");
            self.truncated = Some(limit);
        }
    }

    /// Count one node against the node and time budgets.
    fn admit_node(&mut self) -> bool {
        self.visited += 1;
        if self.visited > self.limits.max_nodes {
            self.truncate(Limit::Nodes);
            return false;
        }
        if self.started.elapsed() >= self.limits.time_budget() {
            self.truncate(Limit::Time);
            return false;
        }
        true
    }

    fn admit_output(&mut self, len: usize) -> bool {
        self.emitted = self.emitted.saturating_add(len);
        if self.emitted > self.limits.max_output_bytes {
            self.truncate(Limit::Output);
            return false;
        }
        true
    }

    fn evaluate_nodes(&mut self, nodes: &[Node]) -> String {
        let mut output = String::new();
        if self.depth > self.limits.max_depth {
            self.truncate(Limit::Depth);
            return output;
        }

        self.depth += 1;
        for node in nodes {
            if self.stopped() || !self.admit_node() {
                break;
            }
            match node {
                Node::Text(text) => {
                    if !self.admit_output(text.text.len()) {
                        break;
                    }
                    output.push_str(&text.text);
                }
                Node::Block(block) => {
                    let piece = self.evaluate_block(block);
                    if !self.admit_output(piece.len()) {
                        break;
                    }
                    output.push_str(&piece);
                }
            }
        }
        self.depth -= 1;
        output
    }

    /// Dispatch to a registered block, then a variable, else keep the
    /// block's own source. Names that are neither leave their parameter
    /// unevaluated.
    fn evaluate_block(&mut self, node: &BlockNode) -> String {
        let spec = self.registry.find(node).copied();
        if spec.is_none() && !resolver::is_bound(self.seed, &self.overlay, &node.declaration) {
            debug!(declaration = %node.raw_declaration, "unknown block; keeping source");
            return self.literal(node);
        }

        let parameter = node
            .parameter
            .as_ref()
            .map(|parameter| self.evaluate_nodes(&parameter.nodes));
        if self.stopped() {
            return String::new();
        }

        if let Some(spec) = spec {
            trace!(block = spec.name(), "dispatching");
            let output = (spec.handler)(&mut BlockContext::new(node, parameter, self));
            return match output {
                Some(output) => output,
                None => self.literal(node),
            };
        }

        if let Some(value) = self.lookup(&node.declaration, parameter.as_deref()) {
            return match &node.payload {
                Some(payload) => {
                    let inner = self.evaluate_nodes(&payload.nodes);
                    format!("{value}({inner})")
                }
                None => value,
            };
        }

        debug!(declaration = %node.raw_declaration, "unresolved variable; keeping source");
        self.literal(node)
    }

    fn lookup(&mut self, reference: &str, parameter: Option<&str>) -> Option<String> {
        let value = resolver::resolve(self.seed, &self.overlay, reference, parameter)?;
        let key = match parameter {
            Some(parameter) => format!("{reference}:{parameter}"),
            None => reference.to_string(),
        };
        self.resolved.insert(key, value.clone());
        Some(value)
    }

    fn literal(&self, node: &BlockNode) -> String {
        self.template.slice(&node.span).to_string()
    }
}

impl Runtime for Evaluator<'_> {
    fn evaluate(&mut self, nodes: &[Node]) -> String {
        self.evaluate_nodes(nodes)
    }

    fn assign(&mut self, name: &str, value: String) -> bool {
        if self.seed.is_reserved(name) {
            return false;
        }
        self.overlay.insert(name.to_string(), value);
        true
    }

    fn response(&mut self) -> &mut Response {
        &mut self.response
    }

    fn limits(&self) -> &Limits {
        self.limits
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn rng(&mut self) -> &mut dyn RngCore {
        &mut self.rng
    }

    fn halt(&mut self, body: String) {
        if self.halted.is_none() {
            debug!(body_len = body.len(), "evaluation halted");
            self.halted = Some(body);
        }
    }

    fn enable_debug(&mut self) {
        self.debug = true;
    }
}
