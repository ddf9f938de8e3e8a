// SPDX-License-Identifier: MIT

//! Role classification rules for named asset families.
//!
//! Administrators write boolean formulas such as `(FB OR Desk) AND Wired`;
//! the engine validates, evaluates and cross-checks them, and classifying
//! clients apply them through a shared read-through cache.

pub mod classifier;
pub mod config;
pub mod error;
pub mod formula;
pub mod rules;
pub mod server;

pub use classifier::{Classification, Classifier, RuleCache, RuleSnapshot};
pub use error::{FormulaError, RuleError, RuleResult};
pub use formula::{evaluate_formula, is_valid, parse, validate, Expression};
pub use rules::{Rule, RuleNode, RuleStore, TreeRule, TreeRuleSource};
