// SPDX-License-Identifier: MIT

//! Consumer-side classification of names into roles
//!
//! This module provides:
//! - `RuleCache` - shared read-through cache of the active rule set
//! - `Classifier` - assigns each name the role of the first matching rule

mod cache;

pub use cache::{CompiledRule, RuleCache, RuleSnapshot, DEFAULT_TTL};

use serde::Serialize;
use std::sync::Arc;

use crate::formula::Candidate;
use crate::rules::TreeRuleSource;

/// Result of classifying one name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub name: String,
    pub role: Option<String>,
}

/// Classifies names against the cached rule set.
///
/// Construct once per process and share by reference; the cache it owns is
/// refreshed independently of any one caller.
pub struct Classifier {
    cache: RuleCache,
}

impl Classifier {
    pub fn new(cache: RuleCache) -> Self {
        Self { cache }
    }

    /// Classifier over a source with the default time-to-live
    pub fn from_source(source: Arc<dyn TreeRuleSource>) -> Self {
        Self::new(RuleCache::new(source))
    }

    pub fn cache(&self) -> &RuleCache {
        &self.cache
    }

    /// Role of the first rule matching `name`, or `None`
    pub async fn classify(&self, name: &str) -> Option<String> {
        self.cache.match_role(name).await
    }

    /// Classify a batch of names against a single snapshot, so one scan
    /// never mixes rules from two refreshes.
    pub async fn classify_all<S: AsRef<str>>(&self, names: &[S]) -> Vec<Classification> {
        let snapshot = self.cache.initialize().await;
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let role = snapshot.as_ref().and_then(|s| {
                    s.first_match_candidate(&Candidate::new(name))
                        .map(str::to_string)
                });
                Classification {
                    name: name.to_string(),
                    role,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Rule, StaticRuleSource};

    fn classifier() -> Classifier {
        Classifier::from_source(Arc::new(StaticRuleSource::new(vec![
            Rule::new("Doors", "Door AND NOT Window"),
            Rule::new("Windows", "Window"),
        ])))
    }

    #[tokio::test]
    async fn test_classify_single_name() {
        let classifier = classifier();
        assert_eq!(classifier.classify("MyDoorFamily").await.as_deref(), Some("Doors"));
        assert_eq!(
            classifier.classify("DoorWindowCombo").await.as_deref(),
            Some("Windows")
        );
        assert_eq!(classifier.classify("Wall").await, None);
    }

    #[tokio::test]
    async fn test_classify_all_preserves_input_order() {
        let classifier = classifier();
        let results = classifier
            .classify_all(&["Wall", "MyDoorFamily", "MyWindowFamily"])
            .await;
        assert_eq!(
            results,
            vec![
                Classification {
                    name: "Wall".into(),
                    role: None
                },
                Classification {
                    name: "MyDoorFamily".into(),
                    role: Some("Doors".into())
                },
                Classification {
                    name: "MyWindowFamily".into(),
                    role: Some("Windows".into())
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_default_ttl() {
        assert_eq!(classifier().cache().ttl(), DEFAULT_TTL);
        assert_eq!(DEFAULT_TTL.as_secs(), 1800);
    }
}
