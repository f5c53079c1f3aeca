use std::fmt::{self, Write as _};

use crate::lexer::Pos;

/// A node of a parsed template body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Comment(String),
    /// `{{ pipeline }}`
    Action(Pipe),
    If(Branch),
    Range(Branch),
    With(Branch),
    /// `{{ template "name" pipeline }}`, also left in place of a `block`.
    Template {
        name: String,
        pipe: Option<Pipe>,
        pos: Pos,
    },
    Break,
    Continue,
}

/// The shared shape of `if`, `range` and `with`.
///
/// An `else if` (or `else with`) chain is represented as an else list that
/// holds exactly one nested node of the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub pipe: Pipe,
    pub list: Vec<Node>,
    pub else_list: Option<Vec<Node>>,
}

/// A pipeline with its optional variable declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipe {
    /// Declared or assigned variables, e.g. `["$k", "$v"]`.
    pub decl: Vec<String>,
    /// `=` rather than `:=`.
    pub is_assign: bool,
    pub cmds: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Dot,
    /// `nil`, `true`, `false` or a character constant, as written.
    Literal(String),
    Number(String),
    String(String),
    /// `.a.b`
    Field(Vec<String>),
    /// `$x.a.b` or `$.a`
    Variable {
        name: String,
        fields: Vec<String>,
        pos: Pos,
    },
    /// `(pipeline).a.b`
    Chain { base: Box<Expr>, fields: Vec<String> },
    /// A function name.
    Identifier(String),
    /// A parenthesized pipeline.
    Pipe(Box<Pipe>),
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[String]) -> fmt::Result {
    for field in fields {
        write!(f, ".{field}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Dot => f.write_str("."),
            Expr::Literal(raw) | Expr::Number(raw) | Expr::Identifier(raw) => f.write_str(raw),
            Expr::String(value) => write!(f, "{value:?}"),
            Expr::Field(fields) => write_fields(f, fields),
            Expr::Variable { name, fields, .. } => {
                f.write_str(name)?;
                write_fields(f, fields)
            }
            Expr::Chain { base, fields } => {
                write!(f, "{base}")?;
                write_fields(f, fields)
            }
            Expr::Pipe(pipe) => write!(f, "({pipe})"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, arg) in self.args.iter().enumerate() {
            if idx > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{arg}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decl.is_empty() {
            f.write_str(&self.decl.join(", "))?;
            f.write_str(if self.is_assign { " = " } else { " := " })?;
        }
        for (idx, cmd) in self.cmds.iter().enumerate() {
            if idx > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{cmd}")?;
        }
        Ok(())
    }
}

/// Render a node list as an indented s-expression.
///
/// Pipelines are rendered in their source form, quoted:
///
/// ```text
/// (List
///   (If ".Values.enabled"
///     (then
///       (Text "on"))))
/// ```
#[must_use]
pub fn to_sexpr(nodes: &[Node]) -> String {
    let mut out = String::from("(List");
    write_list(&mut out, nodes, 1);
    out.push(')');
    out
}

fn indent(out: &mut String, depth: usize) {
    out.push('\n');
    out.push_str(&"  ".repeat(depth));
}

fn write_list(out: &mut String, nodes: &[Node], depth: usize) {
    for node in nodes {
        indent(out, depth);
        write_node(out, node, depth);
    }
}

fn write_branch(out: &mut String, kind: &str, branch: &Branch, depth: usize) {
    out.push_str(&format!("({kind} {:?}", branch.pipe.to_string()));
    indent(out, depth + 1);
    out.push_str("(then");
    write_list(out, &branch.list, depth + 2);
    out.push(')');
    if let Some(else_list) = &branch.else_list {
        indent(out, depth + 1);
        out.push_str("(else");
        write_list(out, else_list, depth + 2);
        out.push(')');
    }
    out.push(')');
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    let leaf = match node {
        Node::Text(text) => format!("(Text {text:?})"),
        Node::Comment(text) => format!("(Comment {text:?})"),
        Node::Action(pipe) => format!("(Action {:?})", pipe.to_string()),
        Node::Template {
            name,
            pipe: Some(pipe),
            ..
        } => format!("(Template {name:?} {:?})", pipe.to_string()),
        Node::Template { name, pipe: None, .. } => format!("(Template {name:?})"),
        Node::Break => "(Break)".to_string(),
        Node::Continue => "(Continue)".to_string(),
        Node::If(branch) => return write_branch(out, "If", branch, depth),
        Node::Range(branch) => return write_branch(out, "Range", branch, depth),
        Node::With(branch) => return write_branch(out, "With", branch, depth),
    };
    out.push_str(&leaf);
}
