// SPDX-License-Identifier: MIT

//! Rule records, tree-form conditions and the stores that serve them

pub mod file;
pub mod http;
pub mod store;
pub mod tree;
pub mod types;

pub use file::FileRuleStore;
pub use http::HttpRuleClient;
pub use store::{RuleStore, StaticRuleSource, TreeRuleSource};
pub use tree::{derive_trees, ConditionOperator, GroupOperator, RuleNode};
pub use types::{Rule, TreeRule, DEFAULT_ROOT_LABEL};
