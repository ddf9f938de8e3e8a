// SPDX-License-Identifier: MIT

//! Rule formula engine
//!
//! Formulas are boolean expressions over literal name fragments:
//! - `Door`
//! - `Door AND NOT Window`
//! - `(FB OR Desk) AND Wired`
//!
//! `NOT` binds tighter than `AND`, which binds tighter than `OR`. Patterns
//! match as case-insensitive substrings of the candidate name.

mod ast;
pub mod conflict;
mod evaluator;
mod parser;
mod token;
mod validator;

pub use ast::{fold_case, Expression, Pattern};
pub use conflict::{
    conflicts_with, detect_conflicts, ConflictingRule, DraftConflict, OperandOverlap,
    RuleConflict,
};
pub use evaluator::{evaluate, evaluate_candidate, evaluate_formula, Candidate};
pub use parser::{parse, parse_tokens};
pub use token::{operands, tokenize, Token, Tokenizer};
pub use validator::{is_valid, validate, validate_tokens, MAX_NESTING};
