// SPDX-License-Identifier: MIT

//! Tree-form rule conditions
//!
//! Offline clients receive rules as a tree of groups and conditions rather
//! than as formula strings. Both forms lower into the same [`Expression`],
//! so there is a single evaluator for either representation.

use serde::{Deserialize, Serialize};

use super::types::{Rule, TreeRule};
use crate::formula::Expression;

/// A node of a tree-form condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleNode {
    /// Combines its children. An empty group never matches.
    Group {
        operator: GroupOperator,
        /// Cosmetic label
        #[serde(default)]
        value: String,
        #[serde(default)]
        children: Vec<RuleNode>,
    },
    /// Tests the candidate against a literal. An empty value never matches.
    Condition {
        operator: ConditionOperator,
        #[serde(default)]
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    Contains,
    NotContains,
}

impl RuleNode {
    /// Lower the tree into the canonical expression form
    pub fn to_expression(&self) -> Expression {
        match self {
            RuleNode::Group {
                operator, children, ..
            } => {
                if children.is_empty() {
                    return Expression::False;
                }
                let items = children.iter().map(RuleNode::to_expression).collect();
                match operator {
                    GroupOperator::And => Expression::all(items),
                    GroupOperator::Or => Expression::any(items),
                }
            }
            RuleNode::Condition { operator, value } => {
                if value.is_empty() {
                    return Expression::False;
                }
                match operator {
                    ConditionOperator::Contains => Expression::pattern(value.as_str()),
                    ConditionOperator::NotContains => {
                        Expression::not(Expression::pattern(value.as_str()))
                    }
                }
            }
        }
    }

    /// Build a tree from a parsed formula, rooted at a group named `label`.
    ///
    /// The tree has no NOT group, so negation is pushed down to the
    /// conditions. This is exact for parser output, which never contains
    /// empty groups or [`Expression::False`]; those lower to an empty group
    /// whether negated or not.
    pub fn from_expression(expr: &Expression, label: &str) -> RuleNode {
        match lower(expr, false) {
            RuleNode::Group {
                operator, children, ..
            } => RuleNode::Group {
                operator,
                value: label.to_string(),
                children,
            },
            condition => RuleNode::Group {
                operator: GroupOperator::And,
                value: label.to_string(),
                children: vec![condition],
            },
        }
    }

    /// Render as a formula, if the tree can be spelled in the grammar
    pub fn to_formula(&self) -> Option<String> {
        self.to_expression().to_formula()
    }
}

fn lower(expr: &Expression, negated: bool) -> RuleNode {
    match expr {
        Expression::Pattern(pattern) => RuleNode::Condition {
            operator: if negated {
                ConditionOperator::NotContains
            } else {
                ConditionOperator::Contains
            },
            value: pattern.text().to_string(),
        },
        Expression::Not(inner) => lower(inner, !negated),
        Expression::And(items) => group(
            if negated {
                GroupOperator::Or
            } else {
                GroupOperator::And
            },
            items,
            negated,
        ),
        Expression::Or(items) => group(
            if negated {
                GroupOperator::And
            } else {
                GroupOperator::Or
            },
            items,
            negated,
        ),
        Expression::False => RuleNode::Group {
            operator: GroupOperator::And,
            value: String::new(),
            children: vec![],
        },
    }
}

fn group(operator: GroupOperator, items: &[Expression], negated: bool) -> RuleNode {
    RuleNode::Group {
        operator,
        value: String::new(),
        children: items.iter().map(|item| lower(item, negated)).collect(),
    }
}

/// Derive tree-form rules from formula rules, keeping their order.
/// Rules whose formula fails validation are skipped.
pub fn derive_trees(rules: &[Rule]) -> Vec<TreeRule> {
    rules
        .iter()
        .filter_map(|rule| match rule.to_tree() {
            Ok(tree) => Some(tree),
            Err(e) => {
                log::warn!(
                    "Skipping rule {} for role '{}': {}",
                    rule.id,
                    rule.role_name,
                    e
                );
                None
            }
        })
        .collect()
}
