// SPDX-License-Identifier: MIT

//! YAML-backed rule store
//!
//! The file is re-read on every listing, so edits are picked up by the next
//! cache refresh without restarting the process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::store::{RuleStore, TreeRuleSource};
use super::tree::derive_trees;
use super::types::{Rule, TreeRule, DEFAULT_ROOT_LABEL};
use crate::error::{RuleError, RuleResult};

/// On-disk layout of a rule file
#[derive(Debug, Deserialize, Serialize)]
pub struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
}

/// One rule as written by an administrator. Identifiers are optional and
/// derived from the role name when omitted, so they stay stable across reads.
#[derive(Debug, Deserialize, Serialize)]
pub struct RuleRecord {
    pub id: Option<Uuid>,
    pub role_id: Option<Uuid>,
    pub role_name: String,
    pub label: Option<String>,
    pub formula: String,
}

impl RuleRecord {
    fn into_rule(self) -> Rule {
        let id = self
            .id
            .unwrap_or_else(|| stable_id("rule", &self.role_name));
        let role_id = self
            .role_id
            .unwrap_or_else(|| stable_id("role", &self.role_name));
        Rule {
            id,
            role_id,
            root_label: self
                .label
                .unwrap_or_else(|| DEFAULT_ROOT_LABEL.to_string()),
            role_name: self.role_name,
            formula: self.formula,
        }
    }
}

fn stable_id(kind: &str, role_name: &str) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("rolematch:{}:{}", kind, role_name).as_bytes(),
    )
}

/// Rule store reading a YAML rule file
#[derive(Debug, Clone)]
pub struct FileRuleStore {
    path: PathBuf,
}

impl FileRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and check the rule file
    pub async fn load(&self) -> RuleResult<Vec<Rule>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let rules = Self::parse_yaml(&content)?;
        log::debug!("Loaded {} rules from {:?}", rules.len(), self.path);
        Ok(rules)
    }

    /// Parse rules from YAML, rejecting invalid formulas and duplicate roles
    pub fn parse_yaml(content: &str) -> RuleResult<Vec<Rule>> {
        let file: RuleFile = serde_yaml::from_str(content)?;
        let rules: Vec<Rule> = file.rules.into_iter().map(RuleRecord::into_rule).collect();

        let mut rule_ids = HashSet::new();
        let mut role_ids = HashSet::new();
        for rule in &rules {
            if !rule_ids.insert(rule.id) {
                return Err(RuleError::store(format!("duplicate rule id {}", rule.id)));
            }
            if !role_ids.insert(rule.role_id) {
                return Err(RuleError::store(format!(
                    "role '{}' has more than one rule",
                    rule.role_name
                )));
            }
            rule.validate().map_err(|e| {
                RuleError::store(format!(
                    "rule for role '{}' has an invalid formula: {}",
                    rule.role_name, e
                ))
            })?;
        }

        Ok(rules)
    }
}

#[async_trait]
impl RuleStore for FileRuleStore {
    async fn list_active_rules(&self) -> RuleResult<Vec<Rule>> {
        self.load().await
    }
}

#[async_trait]
impl TreeRuleSource for FileRuleStore {
    async fn list_active_rules_tree(&self) -> RuleResult<Vec<TreeRule>> {
        Ok(derive_trees(&self.load().await?))
    }
}
