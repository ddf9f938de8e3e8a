// SPDX-License-Identifier: MIT

//! Typed error handling for rolematch-rs
//!
//! Syntax errors in administrator-authored formulas are reported through
//! [`FormulaError`]; everything that can go wrong while loading, fetching or
//! serving rules is a [`RuleError`].

use thiserror::Error;

/// Top-level error type for rolematch-rs
#[derive(Debug, Error)]
pub enum RuleError {
    /// Non-success response from a remote rule server
    #[error("API error from {source_name}: {message}")]
    Api {
        source_name: String,
        message: String,
    },

    /// Rule store rejected its contents (duplicate role, unreadable record)
    #[error("Rule store error: {0}")]
    Store(String),

    /// Configuration errors (bad env vars, malformed URLs)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A formula failed validation
    #[error("Invalid formula: {0}")]
    Formula(#[from] FormulaError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Reasons a formula is rejected by the validator.
///
/// The validator reports only whether a formula is well formed; these
/// variants exist to give administrators a human-readable reason, never a
/// position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,

    /// An operand (pattern, `NOT` or `(`) appeared where an operator was expected
    #[error("expected AND, OR or ')' but found {0}")]
    UnexpectedOperand(String),

    /// An operator or `)` appeared where an operand was expected
    #[error("expected a pattern, NOT or '(' but found {0}")]
    MissingOperand(String),

    #[error("')' without a matching '('")]
    UnmatchedClose,

    #[error("{0} unclosed '('")]
    UnclosedParen(usize),

    #[error("formula ends with a dangling operator")]
    TrailingOperator,

    /// Groups and negations nest past the given limit
    #[error("formula nests deeper than {0} levels")]
    TooDeep(usize),
}

impl RuleError {
    /// Create an API error
    pub fn api(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a rule store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for RuleError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for RuleError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

pub type RuleResult<T> = Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = RuleError::api("rule-server", "503 Service Unavailable");
        assert_eq!(
            err.to_string(),
            "API error from rule-server: 503 Service Unavailable"
        );
    }

    #[test]
    fn test_formula_error_converts() {
        let err: RuleError = FormulaError::UnmatchedClose.into();
        assert!(matches!(err, RuleError::Formula(FormulaError::UnmatchedClose)));
        assert_eq!(
            err.to_string(),
            "Invalid formula: ')' without a matching '('"
        );
    }

    #[test]
    fn test_formula_error_reasons_are_readable() {
        let errors = vec![
            FormulaError::Empty,
            FormulaError::UnexpectedOperand("pattern 'Door'".into()),
            FormulaError::MissingOperand("AND".into()),
            FormulaError::UnmatchedClose,
            FormulaError::UnclosedParen(2),
            FormulaError::TrailingOperator,
            FormulaError::TooDeep(256),
        ];
        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_string_conversion() {
        let err: RuleError = "boom".into();
        assert!(matches!(err, RuleError::Other(ref m) if m == "boom"));
    }
}
