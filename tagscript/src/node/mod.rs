pub mod fragment;

use std::ops::Range;

pub use fragment::Fragment;

/// A single node of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted verbatim.
    Text(TextNode),
    /// A `{declaration:parameter}(payload)` directive.
    Block(BlockNode),
}

impl Node {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Node::Text(text) => &text.span,
            Node::Block(block) => &block.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    /// Byte span in the template source.
    pub span: Range<usize>,
    /// Produced by a backslash escape. Escaped text is never a separator.
    pub escaped: bool,
}

impl TextNode {
    pub fn literal(text: impl Into<String>, span: Range<usize>) -> Self {
        TextNode {
            text: text.into(),
            span,
            escaped: false,
        }
    }
}

/// A block directive with its optional parameter and payload sub-templates.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    /// Block name, trimmed and lowercased.
    pub declaration: String,
    /// Block name as written, trimmed.
    pub raw_declaration: String,
    /// The `:parameter` section inside the braces.
    pub parameter: Option<Fragment>,
    /// The `(payload)` section directly after the closing brace.
    pub payload: Option<Fragment>,
    /// Byte span of the whole directive, payload included.
    pub span: Range<usize>,
}

impl BlockNode {
    /// Whether the declaration equals any of `names` (already lowercase).
    pub fn is_named(&self, names: &[&str]) -> bool {
        names.iter().any(|name| *name == self.declaration)
    }
}
