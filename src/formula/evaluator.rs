//! Expression evaluator
//!
//! A pattern matches when the candidate contains it as a substring, compared
//! case-insensitively without locale collation or normalization. `AND`/`OR`
//! fold their children left to right.

use super::ast::{fold_case, Expression};
use super::parser::parse;

/// A candidate name, case-folded once so it can be tested against many rules
#[derive(Debug, Clone)]
pub struct Candidate {
    folded: String,
}

impl Candidate {
    pub fn new(name: &str) -> Self {
        Self {
            folded: fold_case(name),
        }
    }
}

/// Evaluate an expression against a candidate name
pub fn evaluate(expr: &Expression, candidate: &str) -> bool {
    evaluate_candidate(expr, &Candidate::new(candidate))
}

/// Evaluate an expression against a pre-folded candidate
pub fn evaluate_candidate(expr: &Expression, candidate: &Candidate) -> bool {
    match expr {
        Expression::False => false,
        Expression::Pattern(pattern) => {
            !pattern.is_empty() && candidate.folded.contains(pattern.folded())
        }
        Expression::Not(inner) => !evaluate_candidate(inner, candidate),
        Expression::And(items) => {
            !items.is_empty()
                && items
                    .iter()
                    .fold(true, |acc, item| acc & evaluate_candidate(item, candidate))
        }
        Expression::Or(items) => items
            .iter()
            .fold(false, |acc, item| acc | evaluate_candidate(item, candidate)),
    }
}

/// Parse and evaluate a formula in one step.
///
/// The formula must already have passed validation. An invalid formula
/// trips a debug assertion and evaluates to `false` in release builds.
pub fn evaluate_formula(formula: &str, candidate: &str) -> bool {
    match parse(formula) {
        Ok(expr) => evaluate(&expr, candidate),
        Err(e) => {
            debug_assert!(false, "evaluated invalid formula {:?}: {}", formula, e);
            false
        }
    }
}

impl Expression {
    /// Shorthand for [`evaluate`]
    pub fn matches(&self, candidate: &str) -> bool {
        evaluate(self, candidate)
    }
}
