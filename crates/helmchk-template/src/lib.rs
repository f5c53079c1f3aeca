//! Front end for Go `text/template` sources as used by Helm charts.
//!
//! Sources are lexed and parsed into a closed [`Node`] tree. A
//! [`TemplateSet`] collects the parsed files of a chart together with every
//! `define`d and `block` unit they introduce.

pub mod lexer;
pub mod node;
pub mod parse;
pub mod set;

pub use lexer::Pos;
pub use node::{Branch, Command, Expr, Node, Pipe, to_sexpr};
pub use parse::{ParsedSource, Unit, parse};
pub use set::{SourceKind, TemplateSet};

/// A template source that cannot be parsed, located like Go reports it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("template: {unit}:{pos}: {message}")]
pub struct ParseError {
    /// Name of the unit whose source failed to parse.
    pub unit: String,
    pub pos: Pos,
    pub message: String,
}
