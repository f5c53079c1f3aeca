use std::fmt;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const LEFT_COMMENT: &str = "/*";
const RIGHT_COMMENT: &str = "*/";
const TRIM_MARKER: char = '-';

/// A 1-based line and column (in bytes) inside a template source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Block,
    Break,
    Continue,
    Define,
    Else,
    End,
    If,
    Range,
    Template,
    With,
}

impl Keyword {
    fn from_ident(ident: &str) -> Option<Self> {
        let keyword = match ident {
            "block" => Self::Block,
            "break" => Self::Break,
            "continue" => Self::Continue,
            "define" => Self::Define,
            "else" => Self::Else,
            "end" => Self::End,
            "if" => Self::If,
            "range" => Self::Range,
            "template" => Self::Template,
            "with" => Self::With,
            _ => return None,
        };
        Some(keyword)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Plain text outside of actions, with trim markers already applied.
    Text(String),
    /// A complete `{{/* ... */}}` comment, delimiters excluded.
    Comment(String),
    LeftDelim,
    RightDelim,
    Space,
    Identifier(String),
    Keyword(Keyword),
    /// `.name`, stored without the leading dot.
    Field(String),
    /// `$name` or the bare `$`, stored with the dollar sign.
    Variable(String),
    Dot,
    Number(String),
    /// `nil`, `true`, `false` or a character constant, as written.
    Literal(String),
    /// Unquoted value of an interpreted or raw string literal.
    String(String),
    Pipe,
    LeftParen,
    RightParen,
    Declare,
    Assign,
    Comma,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub token: Token,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{pos}: {message}")]
pub struct LexError {
    pub pos: Pos,
    pub message: String,
}

/// Split `src` into items. The last item is always [`Token::Eof`].
///
/// # Errors
///
/// Returns a [`LexError`] for unterminated actions, comments or literals and
/// for characters that are not valid inside an action.
pub fn lex(src: &str) -> Result<Vec<Item>, LexError> {
    let mut lexer = Lexer::new(src);
    lexer.run()?;
    Ok(lexer.items)
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_alphanumeric(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// `{{- ` trims the text before the action. The marker needs a trailing space
/// so that `{{-3}}` stays a negative number.
fn has_left_trim_marker(after_delim: &str) -> bool {
    let mut chars = after_delim.chars();
    chars.next() == Some(TRIM_MARKER) && chars.next().is_some_and(is_space)
}

/// ` -}}` trims the text after the action.
fn has_right_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_space)
        && chars.next() == Some(TRIM_MARKER)
        && chars.as_str().starts_with(RIGHT_DELIM)
}

struct Lexer<'a> {
    src: &'a str,
    offset: usize,
    line_starts: Vec<usize>,
    items: Vec<Item>,
    trim_next_text: bool,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self {
            src,
            offset: 0,
            line_starts,
            items: Vec::new(),
            trim_next_text: false,
        }
    }

    fn pos_at(&self, offset: usize) -> Pos {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        Pos {
            line: line + 1,
            col: offset - self.line_starts[line] + 1,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        Some(c)
    }

    fn emit(&mut self, token: Token, start: usize) {
        let pos = self.pos_at(start);
        self.items.push(Item { token, pos });
    }

    fn error(&self, start: usize, message: impl Into<String>) -> LexError {
        LexError {
            pos: self.pos_at(start),
            message: message.into(),
        }
    }

    fn run(&mut self) -> Result<(), LexError> {
        loop {
            self.lex_text();
            if self.offset >= self.src.len() {
                self.emit(Token::Eof, self.offset);
                return Ok(());
            }
            self.lex_action()?;
        }
    }

    fn lex_text(&mut self) {
        let start = self.offset;
        let end = self
            .rest()
            .find(LEFT_DELIM)
            .map_or(self.src.len(), |idx| start + idx);
        let mut text = &self.src[start..end];
        let mut text_start = start;
        if std::mem::take(&mut self.trim_next_text) {
            let trimmed = text.trim_start_matches(is_space);
            text_start += text.len() - trimmed.len();
            text = trimmed;
        }
        if end < self.src.len() && has_left_trim_marker(&self.src[end + LEFT_DELIM.len()..]) {
            text = text.trim_end_matches(is_space);
        }
        if !text.is_empty() {
            self.emit(Token::Text(text.to_string()), text_start);
        }
        self.offset = end;
    }

    fn lex_action(&mut self) -> Result<(), LexError> {
        let start = self.offset;
        self.offset += LEFT_DELIM.len();
        if has_left_trim_marker(self.rest()) {
            self.offset += 2;
        }
        if self.rest().starts_with(LEFT_COMMENT) {
            return self.lex_comment(start);
        }
        self.emit(Token::LeftDelim, start);
        while !self.lex_inside_action()? {}
        Ok(())
    }

    fn lex_comment(&mut self, start: usize) -> Result<(), LexError> {
        let body_start = self.offset + LEFT_COMMENT.len();
        let Some(len) = self.src[body_start..].find(RIGHT_COMMENT) else {
            return Err(self.error(start, "unclosed comment"));
        };
        let body = self.src[body_start..body_start + len].to_string();
        self.offset = body_start + len + RIGHT_COMMENT.len();
        if self.rest().starts_with(RIGHT_DELIM) {
            self.offset += RIGHT_DELIM.len();
        } else if has_right_trim_marker(self.rest()) {
            self.offset += 2 + RIGHT_DELIM.len();
            self.trim_next_text = true;
        } else {
            return Err(self.error(start, "comment ends before closing delimiter"));
        }
        self.emit(Token::Comment(body), start);
        Ok(())
    }

    /// Lex one item inside an action. Returns `true` once the closing
    /// delimiter was emitted.
    fn lex_inside_action(&mut self) -> Result<bool, LexError> {
        let start = self.offset;
        let rest = self.rest();
        let closing = if rest.starts_with(RIGHT_DELIM) {
            Some(RIGHT_DELIM.len())
        } else if has_right_trim_marker(rest) {
            self.trim_next_text = true;
            Some(2 + RIGHT_DELIM.len())
        } else {
            None
        };
        if let Some(len) = closing {
            self.offset += len;
            self.emit(Token::RightDelim, start);
            return Ok(true);
        }

        let Some(c) = self.bump() else {
            return Err(self.error(start, "unclosed action"));
        };
        let token = match c {
            c if is_space(c) => {
                while self.peek().is_some_and(is_space) && !has_right_trim_marker(self.rest()) {
                    self.bump();
                }
                Token::Space
            }
            '=' => Token::Assign,
            ':' if self.peek() == Some('=') => {
                self.bump();
                Token::Declare
            }
            '|' => Token::Pipe,
            ',' => Token::Comma,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '"' => Token::String(unquote(self.quoted(start, '"')?)),
            '\'' => Token::Literal(format!("'{}'", self.quoted(start, '\'')?)),
            '`' => {
                let Some(len) = self.rest().find('`') else {
                    return Err(self.error(start, "unterminated raw quoted string"));
                };
                let value = self.rest()[..len].to_string();
                self.offset += len + 1;
                Token::String(value)
            }
            '$' => Token::Variable(format!("${}", self.scan_alphanumeric())),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.number(start),
            '.' => match self.scan_alphanumeric() {
                "" => Token::Dot,
                name => Token::Field(name.to_string()),
            },
            '+' | '-' | '0'..='9' => self.number(start),
            c if is_alphanumeric(c) => {
                self.offset = start;
                match self.scan_alphanumeric() {
                    word @ ("nil" | "true" | "false") => Token::Literal(word.to_string()),
                    word => Keyword::from_ident(word)
                        .map_or_else(|| Token::Identifier(word.to_string()), Token::Keyword),
                }
            }
            other => {
                return Err(self.error(start, format!("unrecognized character in action: {other:?}")));
            }
        };
        self.emit(token, start);
        Ok(false)
    }

    fn scan_alphanumeric(&mut self) -> &'a str {
        let start = self.offset;
        while self.peek().is_some_and(is_alphanumeric) {
            self.bump();
        }
        &self.src[start..self.offset]
    }

    /// Body of a literal opened by `quote`, up to the unescaped closing quote.
    fn quoted(&mut self, start: usize, quote: char) -> Result<&'a str, LexError> {
        let body_start = self.offset;
        loop {
            match self.bump() {
                Some('\\') if self.peek().is_some_and(|c| c != '\n') => {
                    self.bump();
                }
                Some(c) if c == quote => return Ok(&self.src[body_start..self.offset - 1]),
                Some('\n') | None => return Err(self.error(start, "unterminated quoted literal")),
                Some(_) => {}
            }
        }
    }

    /// Numbers are kept as written; only integers matter downstream.
    fn number(&mut self, start: usize) -> Token {
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '+' | '-') && matches!(prev, 'e' | 'E' | 'p' | 'P');
            if !(c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign) {
                break;
            }
            prev = c;
            self.bump();
        }
        Token::Number(self.src[start..self.offset].to_string())
    }
}

/// Resolve the common escape sequences of an interpreted string literal.
/// Others are kept as written.
fn unquote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(escaped @ ('\\' | '"' | '\'')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
