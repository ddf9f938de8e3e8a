// SPDX-License-Identifier: MIT

//! Read-through rule cache
//!
//! Holds the last fetched rule set as an immutable [`RuleSnapshot`] behind
//! an `Arc`. Readers clone the `Arc` and evaluate without holding a lock;
//! refreshes build a complete new snapshot and swap it in whole.
//!
//! At most one fetch runs at a time. A caller that finds the cache stale
//! notes the fetch attempt counter, takes the refresh gate and re-checks
//! before fetching. Callers that queued behind an attempt reuse its outcome,
//! successful or not, instead of fetching again.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use crate::error::RuleResult;
use crate::formula::{evaluate_candidate, Candidate, Expression};
use crate::rules::{TreeRule, TreeRuleSource};

/// Default time-to-live of a fetched rule set
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// A rule lowered into evaluable form
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub role_name: String,
    pub expression: Expression,
}

impl CompiledRule {
    pub fn matches(&self, candidate: &Candidate) -> bool {
        evaluate_candidate(&self.expression, candidate)
    }
}

impl From<&TreeRule> for CompiledRule {
    fn from(rule: &TreeRule) -> Self {
        Self {
            role_name: rule.role_name.clone(),
            expression: rule.root_node.to_expression(),
        }
    }
}

/// An immutable, ordered rule set captured at one point in time
#[derive(Debug)]
pub struct RuleSnapshot {
    rules: Vec<CompiledRule>,
    captured_at: DateTime<Utc>,
    loaded: Instant,
}

impl RuleSnapshot {
    pub fn new(rules: Vec<CompiledRule>) -> Self {
        Self {
            rules,
            captured_at: Utc::now(),
            loaded: Instant::now(),
        }
    }

    /// Compile fetched tree rules, keeping their order. Repeated roles keep
    /// only their first rule.
    pub fn compile(tree_rules: &[TreeRule]) -> Self {
        let mut rules: Vec<CompiledRule> = Vec::with_capacity(tree_rules.len());
        for tree_rule in tree_rules {
            if rules.iter().any(|r| r.role_name == tree_rule.role_name) {
                log::warn!(
                    "Ignoring extra rule for role '{}'; a role has at most one rule",
                    tree_rule.role_name
                );
                continue;
            }
            rules.push(CompiledRule::from(tree_rule));
        }
        Self::new(rules)
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule assigned to a role, if any
    pub fn rule_for(&self, role_name: &str) -> Option<&CompiledRule> {
        self.rules.iter().find(|r| r.role_name == role_name)
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn age(&self) -> Duration {
        self.loaded.elapsed()
    }

    /// Role of the first rule matching `name`, in rule order
    pub fn first_match(&self, name: &str) -> Option<&str> {
        self.first_match_candidate(&Candidate::new(name))
    }

    pub fn first_match_candidate(&self, candidate: &Candidate) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(candidate))
            .map(|rule| rule.role_name.as_str())
    }
}

/// Shared, independently refreshed rule cache
pub struct RuleCache {
    source: Arc<dyn TreeRuleSource>,
    ttl: Duration,
    snapshot: RwLock<Option<Arc<RuleSnapshot>>>,
    refresh_gate: Mutex<()>,
    /// Completed fetch attempts; bumped under the gate
    attempts: AtomicU64,
}

impl RuleCache {
    pub fn new(source: Arc<dyn TreeRuleSource>) -> Self {
        Self::with_ttl(source, DEFAULT_TTL)
    }

    pub fn with_ttl(source: Arc<dyn TreeRuleSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            snapshot: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current snapshot, fresh or stale, without fetching
    pub async fn snapshot(&self) -> Option<Arc<RuleSnapshot>> {
        self.snapshot.read().await.clone()
    }

    async fn fresh_snapshot(&self) -> Option<Arc<RuleSnapshot>> {
        self.snapshot().await.filter(|s| s.age() < self.ttl)
    }

    /// Ensure a usable rule set is present, fetching only when the cache is
    /// empty or stale.
    ///
    /// A failed fetch keeps the previous snapshot, so this returns stale
    /// rules rather than none. Returns `None` only when no fetch has ever
    /// succeeded since start or the last [`invalidate`](Self::invalidate).
    /// Callers that waited on another caller's fetch share its outcome.
    pub async fn initialize(&self) -> Option<Arc<RuleSnapshot>> {
        if let Some(snapshot) = self.fresh_snapshot().await {
            return Some(snapshot);
        }
        let seen = self.attempts.load(Ordering::Acquire);

        let _gate = self.refresh_gate.lock().await;
        // Another caller may have refreshed while we waited for the gate
        if let Some(snapshot) = self.fresh_snapshot().await {
            log::debug!("Rule cache refreshed by a concurrent caller");
            return Some(snapshot);
        }
        if self.attempts.load(Ordering::Acquire) != seen {
            log::debug!("Reusing the outcome of a concurrent rule fetch");
            return self.snapshot().await;
        }

        match self.fetch_and_swap().await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                let previous = self.snapshot().await;
                log::warn!(
                    "Rule fetch failed, keeping {}: {}",
                    if previous.is_some() {
                        "last known rules"
                    } else {
                        "an empty rule set"
                    },
                    e
                );
                previous
            }
        }
    }

    /// Fetch unconditionally. On failure the previous snapshot stays in place
    /// and the error is returned.
    pub async fn refresh(&self) -> RuleResult<Arc<RuleSnapshot>> {
        let _gate = self.refresh_gate.lock().await;
        self.fetch_and_swap().await
    }

    /// Drop the cached rules immediately, without fetching
    pub async fn invalidate(&self) {
        *self.snapshot.write().await = None;
        log::info!("Rule cache invalidated");
    }

    /// Role of the first cached rule matching `name`
    pub async fn match_role(&self, name: &str) -> Option<String> {
        let snapshot = self.initialize().await?;
        snapshot.first_match(name).map(str::to_string)
    }

    /// Caller must hold the refresh gate
    async fn fetch_and_swap(&self) -> RuleResult<Arc<RuleSnapshot>> {
        let started = Instant::now();
        let fetched = self.source.list_active_rules_tree().await;
        // Still under the gate: queued callers see this attempt as finished
        self.attempts.fetch_add(1, Ordering::AcqRel);
        let tree_rules = fetched?;

        let snapshot = Arc::new(RuleSnapshot::compile(&tree_rules));
        *self.snapshot.write().await = Some(snapshot.clone());
        log::info!(
            "Rule cache refreshed: {} rules captured at {} in {}ms",
            snapshot.len(),
            snapshot.captured_at().to_rfc3339(),
            started.elapsed().as_millis()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use crate::rules::{Rule, StaticRuleSource};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Source that counts fetches and can be switched to fail
    struct CountingSource {
        inner: StaticRuleSource,
        fetches: AtomicUsize,
        failing: AtomicBool,
    }

    impl CountingSource {
        fn new(rules: Vec<Rule>) -> Arc<Self> {
            Arc::new(Self {
                inner: StaticRuleSource::new(rules),
                fetches: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TreeRuleSource for CountingSource {
        async fn list_active_rules_tree(&self) -> RuleResult<Vec<TreeRule>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(RuleError::api("test", "unavailable"));
            }
            self.inner.list_active_rules_tree().await
        }
    }

    fn sample_rules() -> Vec<Rule> {
        vec![
            Rule::new("Doors", "Door AND NOT Window"),
            Rule::new("Windows", "Window"),
            Rule::new("Furniture", "(FB OR Desk) AND Wired"),
        ]
    }

    #[test]
    fn test_snapshot_first_match_respects_order() {
        let trees: Vec<TreeRule> = vec![
            Rule::new("Broad", "Door").to_tree().unwrap(),
            Rule::new("Narrow", "DoorFrame").to_tree().unwrap(),
        ];
        let snapshot = RuleSnapshot::compile(&trees);
        assert_eq!(snapshot.first_match("DoorFrame_01"), Some("Broad"));
        assert_eq!(snapshot.first_match("Wall"), None);
    }

    #[test]
    fn test_snapshot_keeps_one_rule_per_role() {
        let trees: Vec<TreeRule> = vec![
            Rule::new("Doors", "Door").to_tree().unwrap(),
            Rule::new("Doors", "Gate").to_tree().unwrap(),
        ];
        let snapshot = RuleSnapshot::compile(&trees);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.rule_for("Doors").is_some());
        assert_eq!(snapshot.first_match("Gate"), None);
    }

    #[tokio::test]
    async fn test_first_use_fetches_once() {
        let source = CountingSource::new(sample_rules());
        let cache = RuleCache::new(source.clone());

        assert!(cache.snapshot().await.is_none());
        assert_eq!(cache.match_role("MyDoorFamily").await.as_deref(), Some("Doors"));
        assert_eq!(cache.match_role("MyWindowFamily").await.as_deref(), Some("Windows"));
        assert_eq!(cache.match_role("Desk_Wired_Type").await.as_deref(), Some("Furniture"));
        assert_eq!(cache.match_role("Wall").await, None);
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_refetches() {
        let source = CountingSource::new(sample_rules());
        let cache = RuleCache::with_ttl(source.clone(), Duration::ZERO);

        cache.initialize().await;
        cache.initialize().await;
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_refresh_always_fetches() {
        let source = CountingSource::new(sample_rules());
        let cache = RuleCache::new(source.clone());

        cache.initialize().await;
        let snapshot = cache.refresh().await.unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_rules() {
        let source = CountingSource::new(sample_rules());
        let cache = RuleCache::new(source.clone());
        assert_eq!(cache.match_role("Gate_01").await, None);

        source
            .inner
            .replace(vec![Rule::new("Gates", "Gate")])
            .await;
        // Still fresh: old rules are served
        assert_eq!(cache.match_role("Gate_01").await, None);

        cache.refresh().await.unwrap();
        assert_eq!(cache.match_role("Gate_01").await.as_deref(), Some("Gates"));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_last_known_rules() {
        let source = CountingSource::new(sample_rules());
        let cache = RuleCache::with_ttl(source.clone(), Duration::ZERO);

        assert_eq!(cache.match_role("MyDoorFamily").await.as_deref(), Some("Doors"));
        source.failing.store(true, Ordering::SeqCst);

        assert_eq!(cache.match_role("MyDoorFamily").await.as_deref(), Some("Doors"));
        assert!(cache.refresh().await.is_err());
        assert_eq!(cache.snapshot().await.map(|s| s.len()), Some(3));
    }

    #[tokio::test]
    async fn test_failure_after_invalidate_yields_no_match() {
        let source = CountingSource::new(sample_rules());
        let cache = RuleCache::new(source.clone());

        cache.initialize().await;
        cache.invalidate().await;
        assert!(cache.snapshot().await.is_none());

        source.failing.store(true, Ordering::SeqCst);
        assert_eq!(cache.match_role("MyDoorFamily").await, None);

        source.failing.store(false, Ordering::SeqCst);
        assert_eq!(cache.match_role("MyDoorFamily").await.as_deref(), Some("Doors"));
    }

    #[tokio::test]
    async fn test_invalidate_does_not_fetch() {
        let source = CountingSource::new(sample_rules());
        let cache = RuleCache::new(source.clone());
        cache.invalidate().await;
        assert_eq!(source.fetches(), 0);
    }

    #[tokio::test]
    async fn test_refresh_advances_capture_time() {
        let source = CountingSource::new(sample_rules());
        let cache = RuleCache::new(source.clone());

        let first = cache.initialize().await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = cache.refresh().await.unwrap();

        assert!(second.captured_at() > first.captured_at());
        assert_eq!(
            cache.snapshot().await.map(|s| s.captured_at()),
            Some(second.captured_at())
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_capture_time() {
        let source = CountingSource::new(sample_rules());
        let cache = RuleCache::new(source.clone());

        let first = cache.initialize().await.unwrap();
        source.failing.store(true, Ordering::SeqCst);
        assert!(cache.refresh().await.is_err());
        assert_eq!(
            cache.snapshot().await.map(|s| s.captured_at()),
            Some(first.captured_at())
        );
    }

    #[tokio::test]
    async fn test_sequential_callers_each_retry_after_failure() {
        let source = CountingSource::new(sample_rules());
        let cache = RuleCache::new(source.clone());
        source.failing.store(true, Ordering::SeqCst);

        assert_eq!(cache.match_role("MyDoorFamily").await, None);
        assert_eq!(cache.match_role("MyDoorFamily").await, None);
        assert_eq!(source.fetches(), 2);

        source.failing.store(false, Ordering::SeqCst);
        assert_eq!(cache.match_role("MyDoorFamily").await.as_deref(), Some("Doors"));
        assert_eq!(source.fetches(), 3);
    }
}
