use std::ops::Range;

use crate::node::{Node, TextNode};

/// A parsed sub-template: the parameter or payload of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub nodes: Vec<Node>,
    /// Byte span of the fragment contents, delimiters excluded.
    pub span: Range<usize>,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Split on `separator` occurring in unescaped top-level text.
    ///
    /// Separators inside nested blocks are left alone, since those blocks are
    /// already their own nodes. Always returns at least one (possibly empty) piece.
    pub fn split(&self, separator: char) -> Vec<Vec<Node>> {
        self.splitn(separator, usize::MAX)
    }

    /// Like [`Fragment::split`], but yields at most `limit` pieces; the last
    /// piece keeps any further separators as text.
    pub fn splitn(&self, separator: char, limit: usize) -> Vec<Vec<Node>> {
        let mut pieces: Vec<Vec<Node>> = vec![Vec::new()];
        for node in &self.nodes {
            let Node::Text(text) = node else {
                push_node(&mut pieces, node.clone());
                continue;
            };
            if text.escaped {
                push_node(&mut pieces, node.clone());
                continue;
            }

            let mut offset = text.span.start;
            let mut rest = text.text.as_str();
            while pieces.len() < limit {
                let Some(at) = rest.find(separator) else {
                    break;
                };
                push_text(&mut pieces, &rest[..at], offset);
                offset += at + separator.len_utf8();
                rest = &rest[at + separator.len_utf8()..];
                pieces.push(Vec::new());
            }
            push_text(&mut pieces, rest, offset);
        }
        pieces
    }
}

fn push_node(pieces: &mut [Vec<Node>], node: Node) {
    if let Some(current) = pieces.last_mut() {
        current.push(node);
    }
}

fn push_text(pieces: &mut [Vec<Node>], text: &str, offset: usize) {
    if !text.is_empty() {
        let span = offset..offset + text.len();
        push_node(pieces, Node::Text(TextNode::literal(text, span)));
    }
}
