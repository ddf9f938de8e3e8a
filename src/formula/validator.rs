// SPDX-License-Identifier: MIT

//! Formula validator
//!
//! Walks the token stream with a single "expecting operand" flag and a stack
//! of open groups. A formula is accepted only if patterns and binary
//! operators alternate, every `)` closes an earlier `(`, and the formula
//! neither ends on an operator nor leaves a group open.
//!
//! Nesting is bounded: every open `(` and every `NOT` still waiting for its
//! operand counts as one level, and no formula may exceed [`MAX_NESTING`].
//! The parser and evaluator recurse once per level, so the bound keeps them
//! within a small, fixed stack.

use super::token::{tokenize, Token};
use crate::error::FormulaError;

/// Deepest nesting of groups and negations a formula may use
pub const MAX_NESTING: usize = 256;

/// Validate a formula, returning a human-readable reason on rejection
pub fn validate(formula: &str) -> Result<(), FormulaError> {
    validate_tokens(&tokenize(formula))
}

/// Returns true if the formula is well formed
pub fn is_valid(formula: &str) -> bool {
    validate(formula).is_ok()
}

/// Validate an already tokenized formula. A missing trailing
/// [`Token::End`] is treated as if it were present.
pub fn validate_tokens(tokens: &[Token]) -> Result<(), FormulaError> {
    if matches!(tokens.first(), None | Some(Token::End)) {
        return Err(FormulaError::Empty);
    }

    let mut expecting_operand = true;
    // Negations that applied to each open group
    let mut groups: Vec<usize> = Vec::new();
    let mut pending_nots: usize = 0;
    let mut depth: usize = 0;

    for token in tokens {
        if token.starts_operand() && !expecting_operand {
            return Err(FormulaError::UnexpectedOperand(token.to_string()));
        }

        match token {
            Token::Pattern(_) => {
                expecting_operand = false;
                pending_nots = 0;
            }
            Token::Not => {
                pending_nots += 1;
                if depth + pending_nots > MAX_NESTING {
                    return Err(FormulaError::TooDeep(MAX_NESTING));
                }
            }
            Token::LParen => {
                depth += pending_nots + 1;
                if depth > MAX_NESTING {
                    return Err(FormulaError::TooDeep(MAX_NESTING));
                }
                groups.push(pending_nots);
                pending_nots = 0;
            }
            Token::And | Token::Or => {
                if expecting_operand {
                    return Err(FormulaError::MissingOperand(token.to_string()));
                }
                expecting_operand = true;
            }
            Token::RParen => {
                if expecting_operand {
                    return Err(FormulaError::MissingOperand(token.to_string()));
                }
                let nots = groups.pop().ok_or(FormulaError::UnmatchedClose)?;
                depth -= nots + 1;
            }
            Token::End => break,
        }
    }

    if expecting_operand {
        return Err(FormulaError::TrailingOperator);
    }
    if !groups.is_empty() {
        return Err(FormulaError::UnclosedParen(groups.len()));
    }
    Ok(())
}
