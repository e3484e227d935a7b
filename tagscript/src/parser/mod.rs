pub mod error;
mod lexer;

pub use error::ParseWarning;

use crate::Template;

/// Default bound on block nesting.
pub const DEFAULT_MAX_DEPTH: usize = 25;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
    max_depth: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser {
            source,
            file_id,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse the source into a node tree. Never fails: anything that does not
    /// form a valid block stays literal text and is noted in `warnings`.
    pub fn parse(self) -> Template {
        let (nodes, warnings) = lexer::parse(&self.source, self.file_id, self.max_depth);
        Template {
            source: self.source,
            nodes,
            warnings,
            source_id: self.file_id,
        }
    }
}
