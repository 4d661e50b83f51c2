//! Formula parser
//!
//! A recursive descent parser over the token stream with operator precedence.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::tokenizer::{tokenize, Token, TokenKind};
use sheetcalc_core::CellAddress;

/// Deepest nesting a formula may have. Parentheses, function calls, prefix
/// operators and each operator in a chain like `1+2+3` add one level.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parse a formula string (starting with `=`) into an AST
///
/// # Example
/// ```rust
/// use sheetcalc_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",\"No\")").unwrap();
/// assert!(parse_formula("=(1+2").is_err());
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula.trim_start();
    let body = formula
        .strip_prefix('=')
        .ok_or_else(|| FormulaError::syntax("Formula must start with '='", 0))?;
    parse_expression(body)
}

/// Parse a formula body (the text after `=`) into an AST
pub fn parse_expression(body: &str) -> FormulaResult<FormulaExpr> {
    parse_tokens(tokenize(body)?)
}

/// Parse an already tokenized formula body
pub fn parse_tokens(tokens: Vec<Token>) -> FormulaResult<FormulaExpr> {
    let input_len = tokens.last().map_or(0, |t| t.end);
    let mut parser = FormulaParser {
        tokens,
        pos: 0,
        input_len,
        depth: 0,
    };

    if parser.tokens.is_empty() {
        return Err(FormulaError::syntax("Empty formula", 0));
    }

    let expr = parser.parse_expression()?;

    // Make sure we consumed all tokens
    if let Some(token) = parser.peek() {
        let message = match token.kind {
            TokenKind::RightParen => "Unbalanced ')'".to_string(),
            _ => format!("Unexpected token '{}'", token),
        };
        return Err(FormulaError::syntax(message, token.position));
    }

    Ok(expr)
}

struct FormulaParser {
    tokens: Vec<Token>,
    pos: usize,
    input_len: usize,
    /// Current nesting level, bounded by MAX_NESTING_DEPTH
    depth: usize,
}

impl FormulaParser {
    // === Token helpers ===

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn current_position(&self) -> usize {
        self.peek().map_or(self.input_len, |t| t.position)
    }

    /// Consume the next token if it is an operator mapping to a binary
    /// operator accepted by `accept`
    fn take_operator(&mut self, accept: impl Fn(BinaryOperator) -> bool) -> Option<BinaryOperator> {
        let token = self.peek()?;
        if token.kind != TokenKind::Operator {
            return None;
        }
        let op = BinaryOperator::from_symbol(&token.value).filter(|op| accept(*op))?;
        self.pos += 1;
        Some(op)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> FormulaResult<Token> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                let token = token.clone();
                self.pos += 1;
                Ok(token)
            }
            Some(token) => Err(FormulaError::syntax(
                format!("Expected {}, found '{}'", what, token),
                token.position,
            )),
            None => Err(FormulaError::syntax(
                format!("Expected {}, found end of formula", what),
                self.input_len,
            )),
        }
    }

    fn descend(&mut self, position: usize) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(FormulaError::syntax(
                format!("Formula nested too deeply (limit {})", MAX_NESTING_DEPTH),
                position,
            ));
        }
        Ok(())
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^ (left associative)
    // 6. Prefix unary: -, +
    // 7. Primary: literals, references, ranges, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_binary_level(|op| op.is_comparison(), Self::parse_concatenation)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_binary_level(|op| op == BinaryOperator::Concat, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_binary_level(
            |op| matches!(op, BinaryOperator::Add | BinaryOperator::Subtract),
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_binary_level(
            |op| matches!(op, BinaryOperator::Multiply | BinaryOperator::Divide),
            Self::parse_power,
        )
    }

    /// Left associative: 2^3^2 = (2^3)^2
    fn parse_power(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_binary_level(|op| op == BinaryOperator::Power, Self::parse_unary)
    }

    /// One left-associative precedence level. Each operator in the chain
    /// wraps the tree built so far, so it counts as a nesting level.
    fn parse_binary_level(
        &mut self,
        accept: impl Fn(BinaryOperator) -> bool,
        operand: fn(&mut Self) -> FormulaResult<FormulaExpr>,
    ) -> FormulaResult<FormulaExpr> {
        let mut left = operand(self)?;
        let base = self.depth;

        loop {
            let position = self.current_position();
            let Some(op) = self.take_operator(&accept) else {
                break;
            };
            self.descend(position)?;
            let right = operand(self)?;
            left = FormulaExpr::binary(op, left, right);
        }

        self.depth = base;
        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        let op = match self.peek() {
            Some(t) if t.is_operator("-") => Some(UnaryOperator::Negate),
            Some(t) if t.is_operator("+") => Some(UnaryOperator::Plus),
            _ => None,
        };

        match op {
            Some(op) => {
                let position = self.current_position();
                self.pos += 1;
                self.descend(position)?;
                let operand = self.parse_unary()?;
                self.depth -= 1;
                Ok(FormulaExpr::unary(op, operand))
            }
            None => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        let position = self.current_position();
        let token = match self.next_token() {
            Some(token) => token,
            None => {
                return Err(FormulaError::syntax(
                    "Missing operand at end of formula",
                    position,
                ))
            }
        };

        match token.kind {
            TokenKind::Number => match token.value.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(FormulaExpr::Number(n)),
                _ => Err(FormulaError::syntax(
                    format!("Invalid number '{}'", token.value),
                    position,
                )),
            },

            TokenKind::String => Ok(FormulaExpr::String(token.value)),

            TokenKind::Boolean => Ok(FormulaExpr::Boolean(token.value == "TRUE")),

            TokenKind::LeftParen => {
                self.descend(position)?;
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "')'")?;
                self.depth -= 1;
                Ok(FormulaExpr::Group(Box::new(expr)))
            }

            TokenKind::CellRef => {
                let start = parse_cell_reference(&token)?;

                if self.peek_kind() == Some(TokenKind::Colon) {
                    self.pos += 1;
                    let end_token = self.expect(TokenKind::CellRef, "cell reference after ':'")?;
                    let end = parse_cell_reference(&end_token)?;
                    return Ok(FormulaExpr::Range { start, end });
                }

                Ok(FormulaExpr::CellRef(start))
            }

            TokenKind::Identifier => {
                if self.peek_kind() == Some(TokenKind::LeftParen) {
                    self.pos += 1;
                    self.descend(position)?;
                    let call = self.parse_function_call(token.value.to_uppercase())?;
                    self.depth -= 1;
                    Ok(call)
                } else {
                    Ok(FormulaExpr::Name(token.value))
                }
            }

            TokenKind::RightParen => Err(FormulaError::syntax(
                "Missing operand before ')'",
                position,
            )),

            TokenKind::Comma | TokenKind::Colon | TokenKind::Operator => Err(FormulaError::syntax(
                format!("Missing operand before '{}'", token),
                position,
            )),
        }
    }

    /// Parse call arguments; the opening parenthesis is already consumed
    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        let mut args = Vec::new();

        if self.peek_kind() == Some(TokenKind::RightParen) {
            self.pos += 1;
            return Ok(FormulaExpr::Function { name, args });
        }

        loop {
            if self.peek_kind() == Some(TokenKind::RightParen) {
                return Err(FormulaError::syntax(
                    format!("Trailing ',' in call to {}", name),
                    self.current_position(),
                ));
            }
            args.push(self.parse_expression()?);

            match self.peek_kind() {
                Some(TokenKind::Comma) => self.pos += 1,
                _ => break,
            }
        }

        self.expect(TokenKind::RightParen, "',' or ')'")?;
        Ok(FormulaExpr::Function { name, args })
    }
}

fn parse_cell_reference(token: &Token) -> FormulaResult<CellAddress> {
    CellAddress::parse(&token.value).map_err(|e| {
        FormulaError::InvalidReference(format!("'{}' at position {}: {}", token.value, token.position, e))
    })
}
