// SPDX-License-Identifier: MIT

//! Rule source traits and an in-memory implementation

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::tree::derive_trees;
use super::types::{Rule, TreeRule};
use crate::error::RuleResult;

/// Central store of rules in formula form.
///
/// Rules come back in the store's stable classification order.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn list_active_rules(&self) -> RuleResult<Vec<Rule>>;
}

/// Source of rules in tree form, as consumed by classifying clients
#[async_trait]
pub trait TreeRuleSource: Send + Sync {
    async fn list_active_rules_tree(&self) -> RuleResult<Vec<TreeRule>>;
}

/// In-memory rule set, shared between clones
#[derive(Clone, Default)]
pub struct StaticRuleSource {
    rules: Arc<RwLock<Vec<Rule>>>,
}

impl StaticRuleSource {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: Arc::new(RwLock::new(rules)),
        }
    }

    /// Replace the whole rule set
    pub async fn replace(&self, rules: Vec<Rule>) {
        *self.rules.write().await = rules;
    }
}

#[async_trait]
impl RuleStore for StaticRuleSource {
    async fn list_active_rules(&self) -> RuleResult<Vec<Rule>> {
        Ok(self.rules.read().await.clone())
    }
}

#[async_trait]
impl TreeRuleSource for StaticRuleSource {
    async fn list_active_rules_tree(&self) -> RuleResult<Vec<TreeRule>> {
        Ok(derive_trees(&self.rules.read().await))
    }
}
