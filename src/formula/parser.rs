// SPDX-License-Identifier: MIT

//! Recursive-descent formula parser
//!
//! Precedence, lowest first:
//! - `Or  := And (OR And)*`
//! - `And := Not (AND Not)*`
//! - `Not := NOT Not | Primary`
//! - `Primary := PATTERN | '(' Or ')'`
//!
//! The steps share one read cursor; each advances past what it consumed.

use super::ast::Expression;
use super::token::{tokenize, Token};
use super::validator::validate_tokens;
use crate::error::FormulaError;

static END: Token = Token::End;

/// Validate and parse a formula into an expression tree
pub fn parse(formula: &str) -> Result<Expression, FormulaError> {
    parse_tokens(&tokenize(formula))
}

/// Validate and parse an already tokenized formula
pub fn parse_tokens(tokens: &[Token]) -> Result<Expression, FormulaError> {
    validate_tokens(tokens)?;

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.advance() {
        Token::End => Ok(expr),
        other => Err(FormulaError::UnexpectedOperand(other.to_string())),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> &'t Token {
        self.tokens.get(self.pos).unwrap_or(&END)
    }

    fn advance(&mut self) -> &'t Token {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Expression, FormulaError> {
        let mut items = vec![self.parse_and()?];
        while *self.peek() == Token::Or {
            self.advance();
            items.push(self.parse_and()?);
        }
        Ok(Expression::any(items))
    }

    fn parse_and(&mut self) -> Result<Expression, FormulaError> {
        let mut items = vec![self.parse_not()?];
        while *self.peek() == Token::And {
            self.advance();
            items.push(self.parse_not()?);
        }
        Ok(Expression::all(items))
    }

    fn parse_not(&mut self) -> Result<Expression, FormulaError> {
        if *self.peek() == Token::Not {
            self.advance();
            return Ok(Expression::not(self.parse_not()?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, FormulaError> {
        match self.advance() {
            Token::Pattern(text) => Ok(Expression::pattern(text.as_str())),
            Token::LParen => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Token::RParen => Ok(inner),
                    _ => Err(FormulaError::UnclosedParen(1)),
                }
            }
            Token::End => Err(FormulaError::TrailingOperator),
            other => Err(FormulaError::MissingOperand(other.to_string())),
        }
    }
}
