//! Formula tokenizer
//!
//! Splits a formula body (the text after the leading `=`) into tokens in a
//! single forward pass. [`Tokenizer`] is an iterator; it stops after the
//! first error.

use crate::error::{FormulaError, FormulaResult};
use std::fmt;

/// Token categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    String,
    Boolean,
    CellRef,
    Identifier,
    Operator,
    LeftParen,
    RightParen,
    Comma,
    Colon,
}

/// A lexed token.
///
/// `value` holds the token's normalized text: the unescaped contents for
/// strings, uppercase `TRUE`/`FALSE` for booleans, uppercase column letters
/// for cell references, and the source text otherwise. `position..end` is
/// the byte span in the formula body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub position: usize,
    pub end: usize,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>, position: usize, end: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            position,
            end,
        }
    }

    /// Whether this is the given operator
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.value == op
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String => write!(f, "\"{}\"", self.value.replace('"', "\"\"")),
            _ => write!(f, "{}", self.value),
        }
    }
}

/// Tokenize a whole formula body
///
/// # Example
/// ```rust
/// use sheetcalc_formula::tokenizer::{tokenize, TokenKind};
///
/// let tokens = tokenize("SUM(a1:$B$2) * 2").unwrap();
/// let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(kinds[0], TokenKind::Identifier);
/// assert_eq!(tokens[2].value, "A1");
/// assert_eq!(tokens[4].value, "$B$2");
/// ```
pub fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    Tokenizer::new(input).collect()
}

/// Single-pass formula tokenizer
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    failed: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            failed: false,
        }
    }

    fn scan_token(&mut self, c: char) -> FormulaResult<Token> {
        let start = self.pos;

        // Single-character tokens
        let single = match c {
            '(' => Some(TokenKind::LeftParen),
            ')' => Some(TokenKind::RightParen),
            ',' => Some(TokenKind::Comma),
            ':' => Some(TokenKind::Colon),
            '+' | '-' | '*' | '/' | '^' | '&' | '=' => Some(TokenKind::Operator),
            _ => None,
        };
        if let Some(kind) = single {
            self.advance();
            return Ok(Token::new(kind, c.to_string(), start, self.pos));
        }

        // Two-character operators
        if c == '<' {
            self.advance();
            let op = match self.peek_char() {
                Some('=') => "<=",
                Some('>') => "<>",
                _ => "<",
            };
            if op.len() == 2 {
                self.advance();
            }
            return Ok(Token::new(TokenKind::Operator, op, start, self.pos));
        }

        if c == '>' {
            self.advance();
            let op = if self.peek_char() == Some('=') {
                self.advance();
                ">="
            } else {
                ">"
            };
            return Ok(Token::new(TokenKind::Operator, op, start, self.pos));
        }

        if c == '"' {
            return self.scan_string();
        }

        if c.is_ascii_digit() || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return Ok(self.scan_number());
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            return self.scan_identifier_or_ref();
        }

        Err(FormulaError::UnexpectedCharacter {
            ch: c,
            position: start,
        })
    }

    fn scan_string(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                None => return Err(FormulaError::UnterminatedString { position: start }),
                Some('"') => {
                    // Check for escaped quote ("")
                    if self.peek_char_at(1) == Some('"') {
                        s.push('"');
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        break;
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }

        Ok(Token::new(TokenKind::String, s, start, self.pos))
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        self.skip_digits();

        if self.peek_char() == Some('.') {
            self.advance();
            self.skip_digits();
        }

        // Exponent, only when digits actually follow
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let digits_at = match self.peek_char_at(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self
                .peek_char_at(digits_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digits_at {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        Token::new(
            TokenKind::Number,
            &self.input[start..self.pos],
            start,
            self.pos,
        )
    }

    fn scan_identifier_or_ref(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        while self.peek_char().map_or(false, |c| {
            c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
        }) {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        // A word directly followed by '(' is a function name (LOG10, TRUE)
        let is_call = self.peek_char() == Some('(');

        if !is_call {
            if text.eq_ignore_ascii_case("TRUE") || text.eq_ignore_ascii_case("FALSE") {
                return Ok(Token::new(
                    TokenKind::Boolean,
                    text.to_ascii_uppercase(),
                    start,
                    self.pos,
                ));
            }

            if is_cell_reference(text) {
                return Ok(Token::new(
                    TokenKind::CellRef,
                    text.to_ascii_uppercase(),
                    start,
                    self.pos,
                ));
            }
        }

        // '$' only appears inside cell references
        if let Some(offset) = text.find('$') {
            return Err(FormulaError::UnexpectedCharacter {
                ch: '$',
                position: start + offset,
            });
        }

        Ok(Token::new(TokenKind::Identifier, text, start, self.pos))
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = FormulaResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        self.skip_whitespace();
        let c = self.peek_char()?;

        let result = self.scan_token(c);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Whether `text` matches `($?)[A-Za-z]+($?)[0-9]+` exactly
pub fn is_cell_reference(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;

    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }

    let letter_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == letter_start {
        return false;
    }

    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }

    let digit_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digit_start {
        return false;
    }

    i == bytes.len()
}
