//! Admission engine.
//!
//! Every request runs the pipeline in order: tenant id, secret, the field
//! validators, then the add or delete transition against the rule store, the
//! rule inventory and the tenant counters.
//!
//! Transitions and reallocations are serialised by the admission lock. The
//! inventory and counters sit behind a separate read-write lock that is only
//! taken for in-memory reads and writes, never across a store call, so
//! lookups are not held up by a slow store. In-memory state is written only
//! after the store has confirmed the change.

mod decision;
mod guard;
mod request;

#[cfg(test)]
mod engine_tests;

pub use decision::{Acceptance, AdmissionResponse, Decision};
pub use guard::{StoreGuard, StorePolicy};
pub use request::{AdmissionRequest, Operation};

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AdmissionError;
use crate::rule::{Rule, RuleId, RuleInventory};
use crate::store::RuleStore;
use crate::tenant::{
    AllocationPolicy, AllocationSummary, CredentialTable, Tenant, TenantId, TenantRegistry,
};
use crate::validate::{check_credential, parse_tenant_id, validate_request};

/// State mutated by admission transitions.
struct EngineState {
    tenants: TenantRegistry,
    inventory: RuleInventory,
}

/// Serialised admission pipeline over one rule store.
pub struct AdmissionEngine {
    name: String,
    slots: u32,
    credentials: CredentialTable,
    store: StoreGuard,
    admission: Mutex<()>,
    state: RwLock<EngineState>,
}

impl AdmissionEngine {
    pub fn new(
        name: impl Into<String>,
        tenants: TenantRegistry,
        credentials: CredentialTable,
        store: StoreGuard,
    ) -> Self {
        Self {
            name: name.into(),
            slots: tenants.slots(),
            credentials,
            store,
            admission: Mutex::new(()),
            state: RwLock::new(EngineState {
                tenants,
                inventory: RuleInventory::new(),
            }),
        }
    }

    /// Builds an engine from configuration on top of `store`.
    pub fn from_config(config: &Config, store: Arc<dyn RuleStore>) -> Self {
        Self::new(
            config.engine_name(),
            TenantRegistry::from_config(&config.tenancy),
            CredentialTable::from_config(&config.credentials),
            StoreGuard::new(
                store,
                StorePolicy::from_config(&config.retry, &config.timeout),
            ),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> u32 {
        self.slots
    }

    /// Name of the rule store backend.
    pub fn store_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Runs one request through the pipeline.
    pub async fn submit(&self, request: &AdmissionRequest) -> AdmissionResponse {
        let admission = self.admission.lock().await;

        let tenant = match self.authenticate(request) {
            Ok(tenant) => tenant,
            Err(rejection) => {
                info!(tenant = %request.tenant_id, reason = %rejection, "Request rejected");
                return AdmissionResponse {
                    decision: Decision::Rejected(rejection),
                    counter: 0,
                };
            }
        };

        let limit = self.sequence_limit(tenant, request.operation).await;
        let outcome = match validate_request(request, tenant, limit) {
            Ok((Operation::Add, rule)) => self.add(tenant, rule).await,
            Ok((Operation::Delete, rule)) => self.delete(tenant, rule.id).await,
            Err(err) => Err(err.into()),
        };
        let counter = self.state.read().await.tenants.live_rules(tenant);
        drop(admission);

        let decision = match outcome {
            Ok(acceptance) => {
                info!(
                    tenant = %tenant,
                    rule_id = %acceptance.rule_id(),
                    counter,
                    "{}",
                    acceptance
                );
                Decision::Accepted(acceptance)
            }
            Err(rejection) => {
                if rejection.is_retryable() {
                    error!(
                        tenant = %tenant,
                        rule_id = %request.rule_id,
                        reason = %rejection,
                        "Request failed"
                    );
                } else {
                    info!(
                        tenant = %tenant,
                        rule_id = %request.rule_id,
                        reason = %rejection,
                        "Request rejected"
                    );
                }
                Decision::Rejected(rejection)
            }
        };

        AdmissionResponse { decision, counter }
    }

    fn authenticate(&self, request: &AdmissionRequest) -> Result<TenantId, AdmissionError> {
        let tenant = parse_tenant_id(&request.tenant_id, self.slots)?;
        check_credential(&self.credentials, tenant, &request.secret)?;
        Ok(tenant)
    }

    /// Highest rule sequence `tenant` may name.
    ///
    /// Adds are bounded by the quota. Deletes may also name any rule the
    /// tenant still holds, so rules admitted before a quota shrink can be
    /// removed.
    async fn sequence_limit(&self, tenant: TenantId, operation: i64) -> u32 {
        let state = self.state.read().await;
        let quota = state.tenants.quota(tenant);
        match Operation::from_code(operation) {
            Some(Operation::Delete) => quota.max(state.inventory.highest_sequence(tenant)),
            _ => quota,
        }
    }

    async fn ensure_quota(&self, tenant: TenantId) -> Result<(), AdmissionError> {
        let state = self.state.read().await;
        let limit = state.tenants.quota(tenant);
        if state.tenants.live_rules(tenant) >= limit {
            return Err(AdmissionError::QuotaExceeded { tenant, limit });
        }
        Ok(())
    }

    async fn add(&self, tenant: TenantId, rule: Rule) -> Result<Acceptance, AdmissionError> {
        let rule_id = rule.id;
        let (known, conflict) = {
            let state = self.state.read().await;
            (
                state.inventory.contains(&rule_id),
                state.inventory.find_conflict(&rule),
            )
        };
        if known || self.store.exists(&rule_id).await? {
            return Err(AdmissionError::AlreadyExists {
                rule_id: rule_id.to_string(),
                tenant,
            });
        }

        let conflict = match conflict {
            None => {
                self.ensure_quota(tenant).await?;
                self.store.put(&rule).await?;
                let mut state = self.state.write().await;
                state.inventory.insert(rule);
                state.tenants.increment(tenant);
                return Ok(Acceptance::Stored { rule_id });
            }
            Some(conflict) => conflict,
        };

        let owner = conflict.owner;
        let existing = conflict.existing.id;
        debug!(tenant = %tenant, owner = %owner, existing = %existing, "Duplicate rule found");

        if owner == tenant {
            return Err(AdmissionError::DuplicateOfOwnRule {
                owner,
                existing: existing.to_string(),
            });
        }
        let winner = self.state.read().await.tenants.resolve_owner(owner, tenant);
        if winner != tenant {
            return Err(AdmissionError::DuplicateOwnedByOther {
                owner,
                existing: existing.to_string(),
            });
        }

        self.ensure_quota(tenant).await?;
        self.migrate(rule, existing).await?;

        Ok(Acceptance::Migrated {
            rule_id,
            previous_owner: owner,
            previous_rule_id: existing,
        })
    }

    /// Moves the rule stored as `previous` to `rule.id`.
    ///
    /// Writes the new identifier before deleting the old one. If the delete
    /// fails the new write is undone and the inventory is left untouched.
    /// On success the rule and one unit of live count move to the new owner.
    async fn migrate(&self, rule: Rule, previous: RuleId) -> Result<(), AdmissionError> {
        self.store.put(&rule).await?;

        if let Err(err) = self.store.delete(&previous).await {
            if let Err(undo) = self.store.delete(&rule.id).await {
                error!(
                    rule_id = %rule.id,
                    error = %undo,
                    "Failed to roll back migrated rule, store may hold both identifiers"
                );
            }
            return Err(err.into());
        }

        let rule_id = rule.id;
        let mut state = self.state.write().await;
        if state.inventory.replace(&previous, rule.clone()).is_none() {
            warn!(
                rule_id = %rule_id,
                previous = %previous,
                "Migrated rule was not in the inventory"
            );
            state.inventory.remove(&previous);
            state.inventory.insert(rule);
        }
        state.tenants.decrement(previous.tenant);
        state.tenants.increment(rule_id.tenant);
        Ok(())
    }

    async fn delete(&self, tenant: TenantId, rule_id: RuleId) -> Result<Acceptance, AdmissionError> {
        if !self.store.exists(&rule_id).await? {
            return Err(AdmissionError::NotFound {
                rule_id: rule_id.to_string(),
                tenant,
            });
        }

        self.store.delete(&rule_id).await?;
        let mut state = self.state.write().await;
        state.inventory.remove(&rule_id);
        state.tenants.decrement(tenant);

        Ok(Acceptance::Deleted { rule_id })
    }

    /// Recomputes every tenant quota.
    ///
    /// Runs under the admission lock, so no request is validated against a
    /// half-updated quota table. `capacity` defaults to the current value.
    /// Live counts are kept, so a tenant may end up above a shrunken quota:
    /// its adds are refused until deletes bring it back under.
    pub async fn reallocate(
        &self,
        policy: AllocationPolicy,
        capacity: Option<u32>,
    ) -> AllocationSummary {
        let _admission = self.admission.lock().await;
        let mut state = self.state.write().await;
        let capacity = capacity.unwrap_or_else(|| state.tenants.capacity());
        state.tenants.reallocate(policy, capacity);

        info!(policy = %policy, capacity, "Tenant quotas reallocated");
        state.tenants.summary()
    }

    /// Snapshot of one tenant.
    pub async fn tenant(&self, id: TenantId) -> Option<Tenant> {
        self.state.read().await.tenants.get(id).cloned()
    }

    /// Number of admitted rules.
    pub async fn rule_count(&self) -> usize {
        self.state.read().await.inventory.len()
    }

    /// Current allocation table.
    pub async fn summary(&self) -> AllocationSummary {
        self.state.read().await.tenants.summary()
    }
}
