//! Rule store backends.
//!
//! The engine touches persistence only through [`RuleStore`]: an existence
//! check, an upsert keyed by identifier, and a delete.

pub mod memory;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::error::Result;
use crate::rule::{Rule, RuleId};

pub use memory::MemoryStore;

/// Persistence seam for admitted rules.
///
/// Implementations only promise that the last write is visible to the next
/// read made through the same handle.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Returns the name of this backend.
    fn name(&self) -> &'static str;

    /// Checks whether a rule is stored under `id`.
    async fn exists(&self, id: &RuleId) -> Result<bool>;

    /// Stores `rule`, replacing any rule with the same identifier.
    async fn put(&self, rule: &Rule) -> Result<()>;

    /// Removes the rule stored under `id`. Deleting an absent id is not an error.
    async fn delete(&self, id: &RuleId) -> Result<()>;
}

/// Creates the rule store selected by configuration.
pub fn create_store(config: &Config) -> Arc<dyn RuleStore> {
    match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    }
}
