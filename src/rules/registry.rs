// SPDX-License-Identifier: MIT

use super::types::{Rule, RuleBook, RuleOutcome, RuleSummary};
use crate::predicate::{EvaluationContext, DEFAULT_MAX_DEPTH};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared, clonable store of rules keyed by id
#[derive(Clone)]
pub struct RuleRegistry {
    rules: Arc<RwLock<HashMap<String, Arc<Rule>>>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry pre-populated with every rule in `book`
    pub async fn from_book(book: RuleBook) -> Self {
        let registry = Self::new();
        for rule in book.rules {
            registry.register(rule).await;
        }
        registry
    }

    pub async fn register(&self, rule: Rule) {
        let mut rules = self.rules.write().await;
        rules.insert(rule.id.clone(), Arc::new(rule));
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Rule>> {
        let rules = self.rules.read().await;
        rules.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<Arc<Rule>> {
        let mut rules = self.rules.write().await;
        rules.remove(id)
    }

    /// Summaries of all rules, ordered by id
    pub async fn list(&self) -> Vec<RuleSummary> {
        let rules = self.rules.read().await;
        let mut summaries: Vec<RuleSummary> = rules.values().map(|r| r.summary()).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Evaluate every active rule against a record, ordered by id
    pub async fn check(&self, ctx: &EvaluationContext) -> Vec<RuleOutcome> {
        self.check_with_limit(ctx, DEFAULT_MAX_DEPTH).await
    }

    pub async fn check_with_limit(
        &self,
        ctx: &EvaluationContext,
        max_depth: usize,
    ) -> Vec<RuleOutcome> {
        let active: Vec<Arc<Rule>> = {
            let rules = self.rules.read().await;
            rules.values().filter(|r| r.active).cloned().collect()
        };
        let mut outcomes: Vec<RuleOutcome> = active
            .iter()
            .map(|r| r.check_with_limit(ctx, max_depth))
            .collect();
        outcomes.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));
        outcomes
    }

    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
