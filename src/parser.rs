//! Tokenizer/grammar for expression commands. A scanner-parser over
//! the raw input: each production reduces by building a `BuilderNode`
//! and asking it for a tree node, and every reduction hands its node
//! back up the call chain, so a finished parse returns the top-level
//! tree directly and concurrent parses never share state.

use std::sync::OnceLock;

use regex::Regex;

use crate::builder::BuilderNode;
use crate::engine::ExprNode;
use crate::error::{ExprError, Position};
use crate::store::DatasetStore;
use crate::value::{Complex32, Complex64};

/// Parse one expression command against the given dataset store.
pub fn parse(input: &str, store: &dyn DatasetStore) -> Result<ExprNode, ExprError> {
    let mut parser = Parser {
        input,
        pos: 0,
        store,
    };
    parser.skip_ws();
    let node = parser.parse_expr()?;
    parser.skip_ws();
    if parser.pos < parser.input.len() {
        return Err(parser.error_point("Unexpected trailing input".to_string()));
    }
    Ok(node)
}

/// Numeric literal: digits (with optional fraction or leading dot),
/// optional exponent, optional `f` (single precision) and `i`/`j`
/// (imaginary) suffixes.
fn number_re() -> &'static Regex {
    static NUMBER_RE: OnceLock<Regex> = OnceLock::new();
    NUMBER_RE.get_or_init(|| {
        Regex::new(r"^(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?([fF])?([ij])?").unwrap()
    })
}

/// Parser state: tracks position in the input string.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
    store: &'a dyn DatasetStore,
}

impl<'a> Parser<'a> {
    // ── Helpers ──────────────────────────────────────────────────────

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn starts_with(&self, s: &str) -> bool {
        self.remaining().starts_with(s)
    }

    fn eat_char(&mut self, ch: char) -> bool {
        if self.peek_char() == Some(ch) {
            self.advance(ch.len_utf8());
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, ch: char) -> Result<(), ExprError> {
        if self.eat_char(ch) {
            Ok(())
        } else {
            Err(self.error_point(format!("Expected '{}'", ch)))
        }
    }

    /// Current position in the source.
    fn position(&self) -> Position {
        let consumed = &self.input[..self.pos];
        let line = consumed.matches('\n').count();
        let last_newline = consumed.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = self.pos - last_newline;
        Position {
            line,
            column,
            offset: self.pos,
        }
    }

    /// Create an error at a single point (current position).
    fn error_point(&self, message: String) -> ExprError {
        let pos = self.position();
        ExprError::syntax(message, pos, pos)
    }

    /// Create an error spanning from `begin` to the current position.
    fn error_span(&self, message: String, begin: Position) -> ExprError {
        ExprError::syntax(message, begin, self.position())
    }

    fn skip_ws(&mut self) {
        loop {
            while let Some(ch) = self.peek_char() {
                if ch == ' ' || ch == '\t' || ch == '\r' || ch == '\n' {
                    self.advance(ch.len_utf8());
                } else {
                    break;
                }
            }
            // Line comments: # to end of line.
            if self.peek_char() == Some('#') {
                while let Some(ch) = self.peek_char() {
                    if ch == '\r' || ch == '\n' {
                        break;
                    }
                    self.advance(ch.len_utf8());
                }
            } else {
                break;
            }
        }
    }

    // ── Expression grammar, loosest binding first ───────────────────

    fn parse_expr(&mut self) -> Result<ExprNode, ExprError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<ExprNode, ExprError> {
        let mut node = self.parse_and()?;
        loop {
            self.skip_ws();
            if !self.starts_with("||") {
                return Ok(node);
            }
            self.advance(2);
            self.skip_ws();
            let rhs = self.parse_and()?;
            node = BuilderNode::name("||").make_func_node(vec![node, rhs])?;
        }
    }

    fn parse_and(&mut self) -> Result<ExprNode, ExprError> {
        let mut node = self.parse_cmp()?;
        loop {
            self.skip_ws();
            if !self.starts_with("&&") {
                return Ok(node);
            }
            self.advance(2);
            self.skip_ws();
            let rhs = self.parse_cmp()?;
            node = BuilderNode::name("&&").make_func_node(vec![node, rhs])?;
        }
    }

    /// Comparisons do not chain: `a < b < c` is a syntax error.
    fn parse_cmp(&mut self) -> Result<ExprNode, ExprError> {
        let node = self.parse_sum()?;
        self.skip_ws();
        let op = ["==", "!=", "<=", ">=", "<", ">"]
            .iter()
            .copied()
            .find(|op| self.starts_with(op));
        let Some(op) = op else {
            return Ok(node);
        };
        self.advance(op.len());
        self.skip_ws();
        let rhs = self.parse_sum()?;
        BuilderNode::name(op).make_func_node(vec![node, rhs])
    }

    fn parse_sum(&mut self) -> Result<ExprNode, ExprError> {
        let mut node = self.parse_term()?;
        loop {
            self.skip_ws();
            let op = match self.peek_char() {
                Some('+') => "+",
                Some('-') => "-",
                _ => return Ok(node),
            };
            self.advance(1);
            self.skip_ws();
            let rhs = self.parse_term()?;
            node = BuilderNode::name(op).make_func_node(vec![node, rhs])?;
        }
    }

    fn parse_term(&mut self) -> Result<ExprNode, ExprError> {
        let mut node = self.parse_unary()?;
        loop {
            self.skip_ws();
            let op = match self.peek_char() {
                Some('*') => "*",
                Some('/') => "/",
                _ => return Ok(node),
            };
            self.advance(1);
            self.skip_ws();
            let rhs = self.parse_unary()?;
            node = BuilderNode::name(op).make_func_node(vec![node, rhs])?;
        }
    }

    /// Unary minus and logical not bind looser than `^`, so `-2^2`
    /// negates the power.
    fn parse_unary(&mut self) -> Result<ExprNode, ExprError> {
        self.skip_ws();
        let op = match self.peek_char() {
            Some('-') => "-",
            Some('!') => "!",
            _ => return self.parse_power(),
        };
        self.advance(1);
        let operand = self.parse_unary()?;
        BuilderNode::name(op).make_func_node(vec![operand])
    }

    fn parse_power(&mut self) -> Result<ExprNode, ExprError> {
        let node = self.parse_primary()?;
        self.skip_ws();
        if !self.eat_char('^') {
            return Ok(node);
        }
        // Right-associative.
        let rhs = self.parse_unary()?;
        BuilderNode::name("^").make_func_node(vec![node, rhs])
    }

    fn parse_primary(&mut self) -> Result<ExprNode, ExprError> {
        self.skip_ws();
        match self.peek_char() {
            Some('(') => {
                self.advance(1);
                let node = self.parse_expr()?;
                self.skip_ws();
                self.expect_char(')')?;
                Ok(node)
            }
            // Single-quoted text is always a literal, even if the text
            // happens to name a dataset.
            Some('\'') => {
                let text = self.parse_quoted('\'')?;
                Ok(BuilderNode::text(text).make_literal_node())
            }
            // Double-quoted names are always dataset references.
            Some('"') => {
                let name = self.parse_quoted('"')?;
                BuilderNode::name(name).make_lattice_node(self.store)
            }
            Some(ch) if ch.is_ascii_digit() => self.parse_number(),
            Some('.') if self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.parse_number()
            }
            Some(ch) if is_ident_start(ch) => self.parse_ident(),
            _ => Err(self.error_point("Expected an expression".to_string())),
        }
    }

    // ── Atoms ───────────────────────────────────────────────────────

    fn parse_number(&mut self) -> Result<ExprNode, ExprError> {
        let begin = self.position();
        let Some(captures) = number_re().captures(self.remaining()) else {
            return Err(self.error_point("Expected a number".to_string()));
        };
        let matched_len = captures.get(0).map_or(0, |m| m.len());
        let digits = captures.get(1).map_or("", |m| m.as_str());
        let has_exponent = captures.get(2).is_some();
        let float_suffix = captures.get(3).is_some();
        let imaginary = captures.get(4).is_some();
        self.advance(matched_len);

        let numeric = &self.input[begin.offset..self.pos];
        let numeric = numeric.trim_end_matches(|c| matches!(c, 'f' | 'F' | 'i' | 'j'));
        let is_integral = !digits.contains('.') && !has_exponent;

        let node = if imaginary {
            // An imaginary constant: `2i` is 0+2i.
            if float_suffix {
                let im = self.parse_float(numeric, begin)? as f32;
                BuilderNode::complex(Complex32::new(0.0, im))
            } else {
                let im = self.parse_float(numeric, begin)?;
                BuilderNode::dcomplex(Complex64::new(0.0, im))
            }
        } else if float_suffix {
            BuilderNode::float(self.parse_float(numeric, begin)? as f32)
        } else if is_integral {
            let value: i64 = numeric
                .parse()
                .map_err(|_| self.error_span(format!("Invalid integer: {}", numeric), begin))?;
            BuilderNode::int(value)
        } else {
            BuilderNode::double(self.parse_float(numeric, begin)?)
        };
        Ok(node.make_literal_node())
    }

    fn parse_float(&self, text: &str, begin: Position) -> Result<f64, ExprError> {
        text.parse()
            .map_err(|_| self.error_span(format!("Invalid number: {}", text), begin))
    }

    fn parse_ident(&mut self) -> Result<ExprNode, ExprError> {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if is_ident_char(ch) {
                self.advance(ch.len_utf8());
            } else {
                break;
            }
        }
        let ident = &self.input[start..self.pos];

        match ident {
            "true" => return Ok(BuilderNode::bool(true).make_literal_node()),
            "false" => return Ok(BuilderNode::bool(false).make_literal_node()),
            _ => {}
        }

        // A following '(' makes it a function name; whitespace may
        // separate the name from its argument list.
        self.skip_ws();
        if self.eat_char('(') {
            let args = self.parse_args()?;
            return BuilderNode::name(ident).make_func_node(args);
        }

        // Bare identifier: dataset or symbolic constant, decided now.
        BuilderNode::name(ident).make_litlatt_node(self.store)
    }

    fn parse_args(&mut self) -> Result<Vec<ExprNode>, ExprError> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.eat_char(')') {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            self.skip_ws();
            if self.eat_char(',') {
                continue;
            }
            self.expect_char(')')?;
            return Ok(args);
        }
    }

    /// A quoted string with `\` escapes; `\n` and `\t` map to their
    /// control characters, anything else is kept literally.
    fn parse_quoted(&mut self, delim: char) -> Result<String, ExprError> {
        let begin = self.position();
        self.expect_char(delim)?;
        let mut result = String::new();
        loop {
            match self.peek_char() {
                None | Some('\r') | Some('\n') => {
                    return Err(self.error_span("Unterminated string".to_string(), begin));
                }
                Some(ch) if ch == delim => {
                    self.advance(ch.len_utf8());
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance(1);
                    match self.peek_char() {
                        None => {
                            return Err(
                                self.error_span("Unterminated escape sequence".to_string(), begin)
                            );
                        }
                        Some('n') => {
                            self.advance(1);
                            result.push('\n');
                        }
                        Some('t') => {
                            self.advance(1);
                            result.push('\t');
                        }
                        Some(ch) => {
                            self.advance(ch.len_utf8());
                            result.push(ch);
                        }
                    }
                }
                Some(ch) => {
                    self.advance(ch.len_utf8());
                    result.push(ch);
                }
            }
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
