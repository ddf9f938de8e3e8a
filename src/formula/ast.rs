// SPDX-License-Identifier: MIT

//! Canonical expression tree shared by formulas and tree-form rules

use super::token::{Token, Tokenizer};

/// A literal operand. Keeps the authored text alongside its case-folded form
/// so evaluation never re-folds the needle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    text: String,
    folded: String,
}

impl Pattern {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let folded = fold_case(&text);
        Self { text, folded }
    }

    /// Text as the administrator wrote it
    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn folded(&self) -> &str {
        &self.folded
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A boolean condition over a candidate name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// Candidate contains the pattern (case-insensitive)
    Pattern(Pattern),
    /// Logical NOT
    Not(Box<Expression>),
    /// All children must match. An empty list never matches.
    And(Vec<Expression>),
    /// At least one child must match
    Or(Vec<Expression>),
    /// Never matches
    False,
}

impl Expression {
    pub fn pattern(text: impl Into<String>) -> Self {
        Expression::Pattern(Pattern::new(text))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    /// Conjunction that collapses a single child into itself
    pub fn all(mut items: Vec<Expression>) -> Self {
        if items.len() == 1 {
            items.remove(0)
        } else {
            Expression::And(items)
        }
    }

    /// Disjunction that collapses a single child into itself
    pub fn any(mut items: Vec<Expression>) -> Self {
        if items.len() == 1 {
            items.remove(0)
        } else {
            Expression::Or(items)
        }
    }

    /// Render back to formula syntax.
    ///
    /// Returns `None` when the tree holds something the grammar cannot
    /// spell: an empty group, [`Expression::False`], or a pattern that is
    /// empty, contains whitespace or parentheses, or reads as a keyword.
    pub fn to_formula(&self) -> Option<String> {
        let mut out = String::new();
        self.write_or(&mut out)?;
        Some(out)
    }

    fn write_or(&self, out: &mut String) -> Option<()> {
        match self {
            Expression::Or(items) if !items.is_empty() => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" OR ");
                    }
                    item.write_and(out)?;
                }
                Some(())
            }
            other => other.write_and(out),
        }
    }

    fn write_and(&self, out: &mut String) -> Option<()> {
        match self {
            Expression::And(items) if !items.is_empty() => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    item.write_not(out)?;
                }
                Some(())
            }
            other => other.write_not(out),
        }
    }

    fn write_not(&self, out: &mut String) -> Option<()> {
        match self {
            Expression::Not(inner) => {
                out.push_str("NOT ");
                inner.write_not(out)
            }
            Expression::Pattern(p) => {
                if !is_spellable(p.text()) {
                    return None;
                }
                out.push_str(p.text());
                Some(())
            }
            Expression::And(items) | Expression::Or(items) if !items.is_empty() => {
                out.push('(');
                self.write_or(out)?;
                out.push(')');
                Some(())
            }
            _ => None,
        }
    }
}

/// A pattern survives a round trip through the tokenizer unchanged
fn is_spellable(text: &str) -> bool {
    let mut tokens = Tokenizer::new(text);
    matches!(
        (tokens.next(), tokens.next()),
        (Some(Token::Pattern(ref t)), Some(Token::End)) if t == text
    )
}

/// Case folding used on both sides of every substring comparison
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_keeps_original_text() {
        let p = Pattern::new("DoorFamily");
        assert_eq!(p.text(), "DoorFamily");
        assert_eq!(p.folded(), "doorfamily");
        assert!(!p.is_empty());
        assert!(Pattern::new("").is_empty());
    }

    #[test]
    fn test_all_and_any_collapse_single_child() {
        assert_eq!(
            Expression::all(vec![Expression::pattern("a")]),
            Expression::pattern("a")
        );
        assert_eq!(
            Expression::any(vec![Expression::pattern("a")]),
            Expression::pattern("a")
        );
        assert_eq!(Expression::all(vec![]), Expression::And(vec![]));
    }

    #[test]
    fn test_to_formula_parenthesizes_lower_precedence() {
        let expr = Expression::all(vec![
            Expression::any(vec![Expression::pattern("FB"), Expression::pattern("Desk")]),
            Expression::pattern("Wired"),
        ]);
        assert_eq!(expr.to_formula().as_deref(), Some("(FB OR Desk) AND Wired"));

        let expr = Expression::any(vec![
            Expression::all(vec![Expression::pattern("a"), Expression::pattern("b")]),
            Expression::not(Expression::pattern("c")),
        ]);
        assert_eq!(expr.to_formula().as_deref(), Some("a AND b OR NOT c"));
    }

    #[test]
    fn test_to_formula_negated_group() {
        let expr = Expression::not(Expression::any(vec![
            Expression::pattern("a"),
            Expression::pattern("b"),
        ]));
        assert_eq!(expr.to_formula().as_deref(), Some("NOT (a OR b)"));
    }

    #[test]
    fn test_to_formula_rejects_unspellable() {
        assert_eq!(Expression::False.to_formula(), None);
        assert_eq!(Expression::And(vec![]).to_formula(), None);
        assert_eq!(Expression::pattern("two words").to_formula(), None);
        assert_eq!(Expression::pattern("and").to_formula(), None);
        assert_eq!(Expression::pattern("a(b").to_formula(), None);
        assert_eq!(Expression::pattern("").to_formula(), None);
    }
}
