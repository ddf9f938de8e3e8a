// SPDX-License-Identifier: MIT

//! Rule records as exchanged with rule stores

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tree::RuleNode;
use crate::error::FormulaError;
use crate::formula;

/// Label given to the root group when a rule does not name one
pub const DEFAULT_ROOT_LABEL: &str = "Root";

fn default_root_label() -> String {
    DEFAULT_ROOT_LABEL.to_string()
}

/// A classification rule in its central, formula form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    /// Owning role. At most one rule exists per role.
    pub role_id: Uuid,
    pub role_name: String,
    /// Cosmetic label of the root node in tree form
    #[serde(default = "default_root_label")]
    pub root_label: String,
    pub formula: String,
}

impl Rule {
    /// Create a rule with fresh identifiers
    pub fn new(role_name: impl Into<String>, formula: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            role_name: role_name.into(),
            root_label: default_root_label(),
            formula: formula.into(),
        }
    }

    /// Validate this rule's formula
    pub fn validate(&self) -> Result<(), FormulaError> {
        formula::validate(&self.formula)
    }

    /// Derive the tree form consumed by classifying clients
    pub fn to_tree(&self) -> Result<TreeRule, FormulaError> {
        let expr = formula::parse(&self.formula)?;
        Ok(TreeRule {
            role_name: self.role_name.clone(),
            root_node: RuleNode::from_expression(&expr, &self.root_label),
        })
    }
}

/// A rule in tree form: the role it assigns and its condition tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRule {
    pub role_name: String,
    pub root_node: RuleNode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rule_defaults() {
        let rule = Rule::new("Doors", "Door AND NOT Window");
        assert_eq!(rule.role_name, "Doors");
        assert_eq!(rule.root_label, DEFAULT_ROOT_LABEL);
        assert_ne!(rule.id, rule.role_id);
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_to_tree_rejects_invalid_formula() {
        let rule = Rule::new("Broken", "Door AND");
        assert_eq!(rule.to_tree(), Err(FormulaError::TrailingOperator));
    }

    #[test]
    fn test_to_tree_uses_root_label() {
        let mut rule = Rule::new("Doors", "Door");
        rule.root_label = "Door rules".into();
        let tree = rule.to_tree().unwrap();
        assert_eq!(tree.role_name, "Doors");
        assert!(matches!(
            tree.root_node,
            RuleNode::Group { ref value, .. } if value == "Door rules"
        ));
    }

    #[test]
    fn test_deserialize_defaults_root_label() {
        let json = serde_json::json!({
            "id": "6f1c1a64-47d6-4f0a-9a7e-5d1b1f0a2c3e",
            "role_id": "0b8f5a1e-8c1a-4a57-9d4b-2f2f8c7c9e11",
            "role_name": "Doors",
            "formula": "Door"
        });
        let rule: Rule = serde_json::from_value(json).unwrap();
        assert_eq!(rule.root_label, "Root");
    }
}
