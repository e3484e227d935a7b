use std::ops::Range;

use crate::node::{BlockNode, Fragment, Node, TextNode};
use crate::parser::error::ParseWarning;

/// Characters a backslash turns into literal text.
const ESCAPABLE: &[u8] = b"{}()|\\";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Split `source` into a node tree.
pub(super) fn parse(
    source: &str,
    file_id: usize,
    max_depth: usize,
) -> (Vec<Node>, Vec<ParseWarning>) {
    let delimiters = Delimiters::scan(source.as_bytes());
    let mut lexer = Lexer {
        source,
        bytes: source.as_bytes(),
        delimiters,
        file_id,
        max_depth,
        warnings: Vec::new(),
    };
    let nodes = lexer.parse_range(0..source.len(), 0);
    (nodes, lexer.warnings)
}

// ---------------------------------------------------------------------------
// Delimiter matching
// ---------------------------------------------------------------------------

/// Matching close positions for every `{` and `(`, computed once up front so
/// that unbalanced input cannot make block scanning quadratic.
struct Delimiters {
    braces: Vec<Option<usize>>,
    parens: Vec<Option<usize>>,
}

impl Delimiters {
    fn scan(bytes: &[u8]) -> Self {
        let mut braces = vec![None; bytes.len()];
        let mut stack = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' if is_escape(bytes, i) => {
                    i += 2;
                    continue;
                }
                b'{' => stack.push(i),
                b'}' => {
                    if let Some(open) = stack.pop() {
                        braces[open] = Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }

        // Parens pair up per brace level: a `)` inside a block never closes
        // a `(` opened outside of it.
        let mut parens = vec![None; bytes.len()];
        let mut levels: Vec<(usize, Vec<usize>)> = vec![(usize::MAX, Vec::new())];
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' if is_escape(bytes, i) => {
                    i += 2;
                    continue;
                }
                b'{' => {
                    if let Some(close) = braces[i] {
                        levels.push((close, Vec::new()));
                    }
                }
                b'}' => {
                    if levels.len() > 1 && levels.last().is_some_and(|(close, _)| *close == i) {
                        levels.pop();
                    }
                }
                b'(' => {
                    if let Some((_, open)) = levels.last_mut() {
                        open.push(i);
                    }
                }
                b')' => {
                    if let Some(open) = levels.last_mut().and_then(|(_, open)| open.pop()) {
                        parens[open] = Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }

        Delimiters { braces, parens }
    }
}

fn is_escape(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'\\' && bytes.get(i + 1).is_some_and(|b| ESCAPABLE.contains(b))
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    delimiters: Delimiters,
    file_id: usize,
    max_depth: usize,
    warnings: Vec<ParseWarning>,
}

impl Lexer<'_> {
    /// `depth` counts enclosing blocks; a fragment at `max_depth` would hold
    /// blocks one level too deep, so it stays text.
    fn parse_range(&mut self, range: Range<usize>, depth: usize) -> Vec<Node> {
        if depth > 0 && depth >= self.max_depth {
            self.warn(
                format!("blocks nested deeper than {} levels", self.max_depth),
                range.clone(),
                "the nested section is kept as literal text",
            );
            if range.is_empty() {
                return Vec::new();
            }
            let text = &self.source[range.clone()];
            return vec![Node::Text(TextNode::literal(text, range))];
        }

        let mut nodes = Vec::new();
        let mut run_start = range.start;
        let mut i = range.start;

        while i < range.end {
            match self.bytes[i] {
                b'\\' if i + 1 < range.end && is_escape(self.bytes, i) => {
                    self.flush_text(&mut nodes, run_start..i);
                    nodes.push(Node::Text(TextNode {
                        text: char::from(self.bytes[i + 1]).to_string(),
                        span: i..i + 2,
                        escaped: true,
                    }));
                    i += 2;
                    run_start = i;
                }
                b'{' => match self.scan_block(i, range.end, depth) {
                    Some((block, next)) => {
                        self.flush_text(&mut nodes, run_start..i);
                        nodes.push(Node::Block(block));
                        i = next;
                        run_start = next;
                    }
                    None => i += 1,
                },
                _ => i += 1,
            }
        }

        self.flush_text(&mut nodes, run_start..range.end);
        nodes
    }

    /// Try to read a block starting at the `{` at `open`. Returns the block
    /// and the position just past it, or None if the `{` is literal text.
    fn scan_block(&mut self, open: usize, end: usize, depth: usize) -> Option<(BlockNode, usize)> {
        let Some(close) = self.delimiters.braces[open].filter(|close| *close < end) else {
            self.warn(
                "unterminated block",
                open..open + 1,
                "the `{` is kept as literal text",
            );
            return None;
        };

        let colon = self.find_colon(open + 1, close);
        let raw = self.source[open + 1..colon.unwrap_or(close)].trim();
        if raw.is_empty() {
            self.warn(
                "empty block declaration",
                open..close + 1,
                "the braces are kept as literal text",
            );
            return None;
        }
        if raw.contains(['{', '}']) {
            // e.g. `{{user}}`: the outer braces are literal, the inner block
            // is picked up when scanning resumes after this `{`.
            return None;
        }

        let parameter = colon.map(|colon| {
            let span = colon + 1..close;
            Fragment {
                nodes: self.parse_range(span.clone(), depth + 1),
                span,
            }
        });

        let mut next = close + 1;
        let mut payload = None;
        if next < end && self.bytes[next] == b'(' {
            match self.delimiters.parens[next].filter(|paren| *paren < end) {
                Some(paren) => {
                    let span = next + 1..paren;
                    payload = Some(Fragment {
                        nodes: self.parse_range(span.clone(), depth + 1),
                        span,
                    });
                    next = paren + 1;
                }
                None => self.warn(
                    "unterminated payload",
                    next..next + 1,
                    "the `(` is kept as literal text",
                ),
            }
        }

        let block = BlockNode {
            declaration: raw.to_lowercase(),
            raw_declaration: raw.to_string(),
            parameter,
            payload,
            span: open..next,
        };
        Some((block, next))
    }

    /// First `:` between `start` and `end` outside nested blocks and escapes.
    fn find_colon(&self, start: usize, end: usize) -> Option<usize> {
        let mut i = start;
        while i < end {
            match self.bytes[i] {
                b'\\' if is_escape(self.bytes, i) => {
                    i += 2;
                    continue;
                }
                b'{' => {
                    if let Some(close) = self.delimiters.braces[i].filter(|close| *close < end) {
                        i = close + 1;
                        continue;
                    }
                }
                b':' => return Some(i),
                _ => {}
            }
            i += 1;
        }
        None
    }

    fn flush_text(&self, nodes: &mut Vec<Node>, span: Range<usize>) {
        if span.is_empty() {
            return;
        }
        let text = &self.source[span.clone()];
        nodes.push(Node::Text(TextNode::literal(text, span)));
    }

    fn warn(&mut self, message: impl Into<String>, span: Range<usize>, note: &str) {
        self.warnings
            .push(ParseWarning::new(message, span, self.file_id).with_note(note));
    }
}
