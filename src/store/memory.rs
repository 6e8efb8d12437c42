//! In-process rule store.
//!
//! Keeps rules in a map keyed by their canonical identifier. Nothing survives
//! a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::trace;

use super::RuleStore;
use crate::error::Result;
use crate::rule::{Rule, RuleId};

/// Rule store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rules: RwLock<HashMap<RuleId, Rule>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rules.
    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }

    /// Returns a copy of the rule stored under `id`.
    #[cfg(test)]
    pub async fn get(&self, id: &RuleId) -> Option<Rule> {
        self.rules.read().await.get(id).cloned()
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, id: &RuleId) -> Result<bool> {
        Ok(self.rules.read().await.contains_key(id))
    }

    async fn put(&self, rule: &Rule) -> Result<()> {
        trace!(rule_id = %rule.id, "Storing rule");
        self.rules.write().await.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn delete(&self, id: &RuleId) -> Result<()> {
        trace!(rule_id = %id, "Deleting rule");
        self.rules.write().await.remove(id);
        Ok(())
    }
}
