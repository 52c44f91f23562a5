//! Source-aware handling of TypeScript: a lexer, a balanced token tree with
//! structural edits, and a small IR for the files we generate ourselves.

pub mod emit;
pub mod ir;
pub mod lexer;
pub mod query;
pub mod tree;

pub use emit::Emit;
pub use lexer::{SyntaxError, Token, TokenKind, normalize};
pub use tree::{Node, SourceFile};

/// First line of every file the pipeline writes from scratch.
pub const GENERATED_HEADER: &str = "/* generated by apiweave -- do not edit */";
