// SPDX-License-Identifier: MIT

//! Rule conflict detection
//!
//! Two rules conflict when any operand of one is a case-insensitive
//! substring of any operand of the other. This deliberately over-reports:
//! it flags pairs that could collide on some name, for human review, rather
//! than proving that they do.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ast::fold_case;
use super::token::operands;
use crate::rules::Rule;

/// Identifies one side of a conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingRule {
    pub rule_id: Uuid,
    pub role_name: String,
}

impl From<&Rule> for ConflictingRule {
    fn from(rule: &Rule) -> Self {
        Self {
            rule_id: rule.id,
            role_name: rule.role_name.clone(),
        }
    }
}

/// The operand pair that made two rules overlap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperandOverlap {
    pub left: String,
    pub right: String,
}

/// A pair of active rules that may classify the same name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConflict {
    pub first: ConflictingRule,
    pub second: ConflictingRule,
    pub overlap: OperandOverlap,
}

/// An active rule that may collide with a draft formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftConflict {
    pub rule: ConflictingRule,
    /// `left` is the draft's operand, `right` the rule's
    pub overlap: OperandOverlap,
}

struct Operand {
    text: String,
    folded: String,
}

fn operand_set(formula: &str) -> Vec<Operand> {
    let mut set: Vec<Operand> = Vec::new();
    for text in operands(formula) {
        let folded = fold_case(&text);
        if !set.iter().any(|o| o.folded == folded) {
            set.push(Operand { text, folded });
        }
    }
    set
}

fn find_overlap(left: &[Operand], right: &[Operand]) -> Option<OperandOverlap> {
    left.iter().find_map(|a| {
        right
            .iter()
            .find(|b| a.folded.contains(&b.folded) || b.folded.contains(&a.folded))
            .map(|b| OperandOverlap {
                left: a.text.clone(),
                right: b.text.clone(),
            })
    })
}

/// Report every unordered pair of rules whose operands overlap.
///
/// `exclude` drops one rule from consideration, so an in-place edit can be
/// checked without the rule conflicting with its own previous version.
pub fn detect_conflicts(rules: &[Rule], exclude: Option<Uuid>) -> Vec<RuleConflict> {
    let candidates: Vec<(&Rule, Vec<Operand>)> = rules
        .iter()
        .filter(|rule| Some(rule.id) != exclude)
        .map(|rule| (rule, operand_set(&rule.formula)))
        .collect();

    let mut conflicts = Vec::new();
    for (i, (first, first_ops)) in candidates.iter().enumerate() {
        for (second, second_ops) in &candidates[i + 1..] {
            if let Some(overlap) = find_overlap(first_ops, second_ops) {
                conflicts.push(RuleConflict {
                    first: ConflictingRule::from(*first),
                    second: ConflictingRule::from(*second),
                    overlap,
                });
            }
        }
    }

    log::debug!(
        "Conflict check over {} rules found {} overlapping pairs",
        candidates.len(),
        conflicts.len()
    );
    conflicts
}

/// Check a draft formula against the active rule set before it is saved
pub fn conflicts_with(formula: &str, rules: &[Rule], exclude: Option<Uuid>) -> Vec<DraftConflict> {
    let draft_ops = operand_set(formula);
    rules
        .iter()
        .filter(|rule| Some(rule.id) != exclude)
        .filter_map(|rule| {
            find_overlap(&draft_ops, &operand_set(&rule.formula)).map(|overlap| DraftConflict {
                rule: ConflictingRule::from(rule),
                overlap,
            })
        })
        .collect()
}
