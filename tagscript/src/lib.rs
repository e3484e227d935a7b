pub mod node;
pub mod parser;

use std::ops::Range;

use crate::node::{BlockNode, Node};
use crate::parser::ParseWarning;

/// A parsed TagScript template.
#[derive(Debug, Clone)]
pub struct Template {
    /// The original template text. Node spans index into this.
    pub source: String,
    /// Top-level nodes in document order.
    pub nodes: Vec<Node>,
    /// Fail-open decisions taken while parsing (never fatal).
    pub warnings: Vec<ParseWarning>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Template {
    /// The source text covered by `span`, or "" if the span is out of range.
    pub fn slice(&self, span: &Range<usize>) -> &str {
        self.source.get(span.clone()).unwrap_or("")
    }

    /// Every block node in the tree, depth-first, parameters before payloads.
    pub fn blocks(&self) -> Vec<&BlockNode> {
        let mut out = Vec::new();
        collect_blocks(&self.nodes, &mut out);
        out
    }
}

fn collect_blocks<'a>(nodes: &'a [Node], out: &mut Vec<&'a BlockNode>) {
    for node in nodes {
        if let Node::Block(block) = node {
            out.push(block);
            if let Some(parameter) = &block.parameter {
                collect_blocks(&parameter.nodes, out);
            }
            if let Some(payload) = &block.payload {
                collect_blocks(&payload.nodes, out);
            }
        }
    }
}
