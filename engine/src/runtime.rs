use chrono::{DateTime, Utc};
use rand::RngCore;
use tagscript::node::{BlockNode, Node};

use crate::config::Limits;
use crate::response::Response;

/// What a block handler may do to the evaluation it runs in.
///
/// Handlers only ever see this trait, so they can be exercised against a
/// stub instead of a full evaluator.
pub trait Runtime {
    /// Evaluate nodes in the current overlay and return the produced text.
    fn evaluate(&mut self, nodes: &[Node]) -> String;

    /// Bind `name` in the overlay. Returns `false` for reserved seed names.
    fn assign(&mut self, name: &str, value: String) -> bool;

    fn response(&mut self) -> &mut Response;

    fn limits(&self) -> &Limits;

    /// Wall-clock time captured once per `process` call.
    fn now(&self) -> DateTime<Utc>;

    fn rng(&mut self) -> &mut dyn RngCore;

    /// Stop evaluation; `body` replaces everything produced so far.
    fn halt(&mut self, body: String);

    /// Attach the resolved-variable trace to the response.
    fn enable_debug(&mut self);
}

/// Everything a handler gets for one block node.
pub struct BlockContext<'a> {
    pub node: &'a BlockNode,
    /// The parameter, already evaluated.
    pub parameter: Option<String>,
    pub runtime: &'a mut dyn Runtime,
}

impl<'a> BlockContext<'a> {
    pub fn new(
        node: &'a BlockNode,
        parameter: Option<String>,
        runtime: &'a mut dyn Runtime,
    ) -> Self {
        BlockContext {
            node,
            parameter,
            runtime,
        }
    }

    /// The trimmed parameter, or `None` when absent or blank.
    pub fn argument(&self) -> Option<&str> {
        self.parameter
            .as_deref()
            .map(str::trim)
            .filter(|argument| !argument.is_empty())
    }

    pub fn has_payload(&self) -> bool {
        self.node.payload.is_some()
    }

    /// Evaluate the whole payload. Each call evaluates again.
    pub fn payload(&mut self) -> Option<String> {
        let payload = self.node.payload.as_ref()?;
        Some(self.runtime.evaluate(&payload.nodes))
    }

    /// Unevaluated payload pieces split on `separator`, at most `limit` of
    /// them. Empty when there is no payload.
    pub fn payload_pieces(&self, separator: char, limit: usize) -> Vec<Vec<Node>> {
        self.node
            .payload
            .as_ref()
            .map(|payload| payload.splitn(separator, limit))
            .unwrap_or_default()
    }

    pub fn evaluate(&mut self, nodes: &[Node]) -> String {
        self.runtime.evaluate(nodes)
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use std::collections::HashMap;

    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tagscript::parser::Parser;

    use super::*;
    use crate::block::BlockSpec;

    /// Runtime that renders nested blocks as `<name>` and records calls.
    pub struct StubRuntime {
        pub response: Response,
        pub overlay: HashMap<String, String>,
        pub reserved: Vec<String>,
        pub limits: Limits,
        pub halted: Option<String>,
        pub debug: bool,
        rng: StdRng,
    }

    impl Default for StubRuntime {
        fn default() -> Self {
            StubRuntime {
                response: Response::default(),
                overlay: HashMap::new(),
                reserved: vec!["user".to_string()],
                limits: Limits::default(),
                halted: None,
                debug: false,
                rng: StdRng::seed_from_u64(0),
            }
        }
    }

    impl Runtime for StubRuntime {
        fn evaluate(&mut self, nodes: &[Node]) -> String {
            nodes
                .iter()
                .map(|node| match node {
                    Node::Text(text) => text.text.clone(),
                    Node::Block(block) => format!("<{}>", block.declaration),
                })
                .collect()
        }

        fn assign(&mut self, name: &str, value: String) -> bool {
            if self.reserved.iter().any(|reserved| reserved == name) {
                return false;
            }
            self.overlay.insert(name.to_string(), value);
            true
        }

        fn response(&mut self) -> &mut Response {
            &mut self.response
        }

        fn limits(&self) -> &Limits {
            &self.limits
        }

        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0)
                .single()
                .unwrap_or_default()
        }

        fn rng(&mut self) -> &mut dyn RngCore {
            &mut self.rng
        }

        fn halt(&mut self, body: String) {
            self.halted.get_or_insert(body);
        }

        fn enable_debug(&mut self) {
            self.debug = true;
        }
    }

    /// Run the handler of `spec` on the first block of `source`, with the
    /// parameter given verbatim.
    pub fn call(spec: &BlockSpec, source: &str, runtime: &mut StubRuntime) -> Option<String> {
        let template = Parser::new(source.to_string(), 0).parse();
        let Some(Node::Block(node)) = template.nodes.first() else {
            panic!("no block in {source:?}");
        };
        let parameter = node
            .parameter
            .as_ref()
            .map(|parameter| runtime.evaluate(&parameter.nodes));
        let mut ctx = BlockContext::new(node, parameter, runtime);
        (spec.handler)(&mut ctx)
    }

    /// Find a standard block by alias.
    pub fn spec(name: &str) -> BlockSpec {
        crate::block::BlockRegistry::standard()
            .get(name)
            .copied()
            .unwrap_or_else(|| panic!("no block named {name}"))
    }
}
