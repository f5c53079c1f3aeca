//! Recursive descent parser producing [`Node`] trees.
//!
//! The parser recovers structure only. Checks that Go performs on top of it
//! (`break` outside `range`, `define` below top level, literal pipeline
//! stages) are left to Helm.

use crate::ParseError;
use crate::lexer::{self, Item, Keyword, Pos, Token};
use crate::node::{Branch, Command, Expr, Node, Pipe};

/// A named template body, either a whole file or a `define`/`block`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    pub body: Vec<Node>,
}

/// The result of parsing one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSource {
    /// Top level nodes, with every `define` removed.
    pub body: Vec<Node>,
    /// Units introduced by `define` and `block`, in source order.
    pub defines: Vec<Unit>,
}

/// Parse the template source of the unit named `name`.
///
/// # Errors
///
/// Returns a [`ParseError`] carrying `name` and the position of the offending
/// token if `src` is not a valid template.
pub fn parse(name: &str, src: &str) -> Result<ParsedSource, ParseError> {
    let items = lexer::lex(src).map_err(|err| ParseError {
        unit: name.to_string(),
        pos: err.pos,
        message: err.message,
    })?;
    let mut parser = Parser {
        unit: name,
        items,
        idx: 0,
        defines: Vec::new(),
    };
    let (body, end) = parser.item_list()?;
    match end {
        ListEnd::Eof(_) => Ok(ParsedSource {
            body,
            defines: parser.defines,
        }),
        ListEnd::End(pos) => Err(parser.error(pos, "unexpected {{end}}")),
        ListEnd::Else(pos, _) => Err(parser.error(pos, "unexpected {{else}}")),
    }
}

/// What a single action turned out to be.
enum Parsed {
    Node(Node),
    Defined,
    End,
    /// `{{else}}`, or `{{else if ...` / `{{else with ...` with the keyword
    /// consumed and its pipeline still pending.
    Else(Option<Keyword>),
}

/// How a list of nodes ended.
enum ListEnd {
    Eof(Pos),
    End(Pos),
    Else(Pos, Option<Keyword>),
}

struct Parser<'a> {
    unit: &'a str,
    items: Vec<Item>,
    idx: usize,
    defines: Vec<Unit>,
}

impl Parser<'_> {
    fn error(&self, pos: Pos, message: impl Into<String>) -> ParseError {
        ParseError {
            unit: self.unit.to_string(),
            pos,
            message: message.into(),
        }
    }

    fn unexpected(&self, item: &Item, context: &str) -> ParseError {
        self.error(item.pos, format!("unexpected {:?} in {context}", item.token))
    }

    fn peek(&self) -> &Item {
        // the lexer always terminates the stream with `Eof`
        let last = self.items.len() - 1;
        &self.items[self.idx.min(last)]
    }

    fn next(&mut self) -> Item {
        let item = self.peek().clone();
        self.idx += 1;
        item
    }

    fn next_non_space(&mut self) -> Item {
        loop {
            let item = self.next();
            if item.token != Token::Space {
                return item;
            }
        }
    }

    fn peek_non_space(&mut self) -> Item {
        let saved = self.idx;
        let item = self.next_non_space();
        self.idx = saved;
        item
    }

    fn expect_right_delim(&mut self, context: &str) -> Result<(), ParseError> {
        let item = self.next_non_space();
        if item.token == Token::RightDelim {
            Ok(())
        } else {
            Err(self.unexpected(&item, context))
        }
    }

    fn item_list(&mut self) -> Result<(Vec<Node>, ListEnd), ParseError> {
        let mut list = Vec::new();
        loop {
            let item = self.next();
            match item.token {
                Token::Text(text) => list.push(Node::Text(text)),
                Token::Comment(text) => list.push(Node::Comment(text)),
                Token::Eof => return Ok((list, ListEnd::Eof(item.pos))),
                Token::LeftDelim => match self.action()? {
                    Parsed::Node(node) => list.push(node),
                    Parsed::Defined => {}
                    Parsed::End => return Ok((list, ListEnd::End(item.pos))),
                    Parsed::Else(chained) => return Ok((list, ListEnd::Else(item.pos, chained))),
                },
                _ => return Err(self.unexpected(&item, "input")),
            }
        }
    }

    /// The body of a construct, up to its `end` or `else`.
    fn body(&mut self, context: &str) -> Result<(Vec<Node>, Option<(Pos, Option<Keyword>)>), ParseError> {
        match self.item_list()? {
            (_, ListEnd::Eof(pos)) => Err(self.error(pos, format!("unexpected EOF in {context}"))),
            (list, ListEnd::End(_)) => Ok((list, None)),
            (list, ListEnd::Else(pos, chained)) => Ok((list, Some((pos, chained)))),
        }
    }

    fn action(&mut self) -> Result<Parsed, ParseError> {
        let saved = self.idx;
        let item = self.next_non_space();
        let Token::Keyword(keyword) = item.token else {
            self.idx = saved;
            let pipe = self.pipeline("command", &Token::RightDelim)?;
            return Ok(Parsed::Node(Node::Action(pipe)));
        };
        let node = match keyword {
            Keyword::Block => self.block(item.pos)?,
            Keyword::Break => {
                self.expect_right_delim("break")?;
                Node::Break
            }
            Keyword::Continue => {
                self.expect_right_delim("continue")?;
                Node::Continue
            }
            Keyword::Define => {
                self.define()?;
                return Ok(Parsed::Defined);
            }
            Keyword::Else => {
                if let Token::Keyword(chained @ (Keyword::If | Keyword::With)) = self.peek_non_space().token {
                    self.next_non_space();
                    return Ok(Parsed::Else(Some(chained)));
                }
                self.expect_right_delim("else")?;
                return Ok(Parsed::Else(None));
            }
            Keyword::End => {
                self.expect_right_delim("end")?;
                return Ok(Parsed::End);
            }
            Keyword::If => Node::If(self.branch("if")?),
            Keyword::Range => Node::Range(self.branch("range")?),
            Keyword::With => Node::With(self.branch("with")?),
            Keyword::Template => self.template(item.pos)?,
        };
        Ok(Parsed::Node(node))
    }

    /// `if`, `range` or `with` after its keyword. An `else if`/`else with`
    /// becomes the single node of the else list and shares the `end`.
    fn branch(&mut self, context: &str) -> Result<Branch, ParseError> {
        let pipe = self.pipeline(context, &Token::RightDelim)?;
        let (list, close) = self.body(context)?;
        let else_list = match close {
            None => None,
            Some((_, Some(Keyword::With))) => Some(vec![Node::With(self.branch("with")?)]),
            Some((_, Some(_))) => Some(vec![Node::If(self.branch("if")?)]),
            Some((_, None)) => match self.body(context)? {
                (else_list, None) => Some(else_list),
                (_, Some((pos, _))) => return Err(self.error(pos, "expected end; found {{else}}")),
            },
        };
        Ok(Branch {
            pipe,
            list,
            else_list,
        })
    }

    fn string_literal(&mut self, context: &str) -> Result<String, ParseError> {
        let item = self.next_non_space();
        match item.token {
            Token::String(value) => Ok(value),
            _ => Err(self.unexpected(&item, context)),
        }
    }

    /// Body of a `define` or `block`, which has no else branch.
    fn unit_body(&mut self, context: &str) -> Result<Vec<Node>, ParseError> {
        match self.body(context)? {
            (body, None) => Ok(body),
            (_, Some((pos, _))) => Err(self.error(pos, format!("unexpected {{{{else}}}} in {context}"))),
        }
    }

    fn template(&mut self, pos: Pos) -> Result<Node, ParseError> {
        let context = "template clause";
        let name = self.string_literal(context)?;
        let pipe = if self.peek_non_space().token == Token::RightDelim {
            self.next_non_space();
            None
        } else {
            Some(self.pipeline(context, &Token::RightDelim)?)
        };
        Ok(Node::Template { name, pipe, pos })
    }

    fn define(&mut self) -> Result<(), ParseError> {
        let context = "define clause";
        let name = self.string_literal(context)?;
        self.expect_right_delim(context)?;
        let body = self.unit_body(context)?;
        self.defines.push(Unit { name, body });
        Ok(())
    }

    fn block(&mut self, pos: Pos) -> Result<Node, ParseError> {
        let context = "block clause";
        let name = self.string_literal(context)?;
        let pipe = self.pipeline(context, &Token::RightDelim)?;
        let body = self.unit_body(context)?;
        self.defines.push(Unit {
            name: name.clone(),
            body,
        });
        Ok(Node::Template {
            name,
            pipe: Some(pipe),
            pos,
        })
    }

    /// Parse an optional declaration followed by commands, up to and
    /// including `end`.
    fn pipeline(&mut self, context: &str, end: &Token) -> Result<Pipe, ParseError> {
        let (decl, is_assign) = self.declaration();
        let mut cmds = Vec::new();
        loop {
            let item = self.peek_non_space();
            if &item.token == end {
                self.next_non_space();
                if cmds.is_empty() {
                    return Err(self.error(item.pos, format!("missing value for {context}")));
                }
                return Ok(Pipe {
                    decl,
                    is_assign,
                    cmds,
                });
            }
            match item.token {
                Token::Dot
                | Token::Field(_)
                | Token::Identifier(_)
                | Token::Literal(_)
                | Token::Number(_)
                | Token::String(_)
                | Token::Variable(_)
                | Token::LeftParen => cmds.push(self.command()?),
                _ => return Err(self.unexpected(&item, context)),
            }
        }
    }

    /// `$x :=`, `$x =` or `$k, $v :=`. Consumes nothing if the pipeline does
    /// not start with a declaration.
    fn declaration(&mut self) -> (Vec<String>, bool) {
        let saved = self.idx;
        let mut names = Vec::new();
        while let Token::Variable(name) = self.next_non_space().token {
            names.push(name);
            match self.next_non_space().token {
                Token::Comma => {}
                Token::Declare => return (names, false),
                Token::Assign => return (names, true),
                _ => break,
            }
        }
        self.idx = saved;
        (Vec::new(), false)
    }

    fn command(&mut self) -> Result<Command, ParseError> {
        let mut args = Vec::new();
        loop {
            if let Some(operand) = self.operand()? {
                args.push(operand);
            }
            let item = self.next();
            match item.token {
                Token::Space => continue,
                Token::RightDelim | Token::RightParen => self.idx -= 1,
                Token::Pipe => {}
                _ => return Err(self.unexpected(&item, "operand")),
            }
            return Ok(Command { args });
        }
    }

    /// A term followed by any number of field accesses.
    fn operand(&mut self) -> Result<Option<Expr>, ParseError> {
        let Some(term) = self.term()? else {
            return Ok(None);
        };
        let mut fields = Vec::new();
        while let Token::Field(name) = &self.peek().token {
            fields.push(name.clone());
            self.idx += 1;
        }
        if fields.is_empty() {
            return Ok(Some(term));
        }
        let expr = match term {
            Expr::Field(mut names) => {
                names.extend(fields);
                Expr::Field(names)
            }
            Expr::Variable {
                name,
                fields: mut names,
                pos,
            } => {
                names.extend(fields);
                Expr::Variable {
                    name,
                    fields: names,
                    pos,
                }
            }
            base => Expr::Chain {
                base: Box::new(base),
                fields,
            },
        };
        Ok(Some(expr))
    }

    fn term(&mut self) -> Result<Option<Expr>, ParseError> {
        let saved = self.idx;
        let item = self.next_non_space();
        let expr = match item.token {
            Token::Identifier(name) => Expr::Identifier(name),
            Token::Dot => Expr::Dot,
            Token::Variable(name) => Expr::Variable {
                name,
                fields: Vec::new(),
                pos: item.pos,
            },
            Token::Field(name) => Expr::Field(vec![name]),
            Token::Number(raw) => Expr::Number(raw),
            Token::Literal(raw) => Expr::Literal(raw),
            Token::String(value) => Expr::String(value),
            Token::LeftParen => {
                Expr::Pipe(Box::new(self.pipeline("parenthesized pipeline", &Token::RightParen)?))
            }
            _ => {
                self.idx = saved;
                return Ok(None);
            }
        };
        Ok(Some(expr))
    }
}
