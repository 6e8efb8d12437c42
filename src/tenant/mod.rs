//! Tenant registry.
//!
//! Every tenant slot in `[0, slots)` exists for the whole process lifetime.
//! A tenant carries a precedence tier, a rule quota computed by [`quota`], and
//! a live rule count that only the admission engine mutates.

mod credentials;
pub mod quota;

pub use credentials::CredentialTable;
pub use quota::{
    allocate, default_tiers, AllocationPolicy, AllocationSummary, TierAllocation, TierSpec,
};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::TenancyConfig;
use crate::error::RulewardError;

/// Numeric tenant identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(u32);

impl TenantId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which end of the tier list wins ownership arbitration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierPrecedence {
    /// Tier 0 outranks tier 1, which outranks tier 2, and so on.
    #[default]
    LowestIndexFirst,
    /// The last tier outranks every tier before it.
    HighestIndexFirst,
}

impl FromStr for TierPrecedence {
    type Err = RulewardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lowest_index_first" | "lowest" => Ok(TierPrecedence::LowestIndexFirst),
            "highest_index_first" | "highest" => Ok(TierPrecedence::HighestIndexFirst),
            _ => Err(RulewardError::config(format!(
                "Unknown tier precedence: {}",
                s
            ))),
        }
    }
}

/// A tenant slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Tenant id.
    pub id: TenantId,
    /// Precedence tier, `None` when the slot falls outside every configured tier.
    pub tier: Option<usize>,
    /// Maximum number of rules the tenant may own.
    pub quota: u32,
    /// Rules currently owned.
    pub live_rules: u32,
}

/// All tenant slots plus the inputs their quotas were computed from.
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    tenants: BTreeMap<TenantId, Tenant>,
    tiers: Vec<TierSpec>,
    precedence: TierPrecedence,
    policy: AllocationPolicy,
    capacity: u32,
}

impl TenantRegistry {
    /// Creates `slots` tenants, assigning tiers contiguously by id.
    pub fn new(
        slots: u32,
        capacity: u32,
        policy: AllocationPolicy,
        tiers: Vec<TierSpec>,
        precedence: TierPrecedence,
    ) -> Self {
        let assignment = assign_tiers(slots, &tiers);
        let quotas = allocate(policy, capacity, &assignment, &tiers);

        let tenants = assignment
            .iter()
            .zip(quotas)
            .enumerate()
            .map(|(index, (tier, quota))| {
                let id = TenantId::new(index as u32);
                (
                    id,
                    Tenant {
                        id,
                        tier: *tier,
                        quota,
                        live_rules: 0,
                    },
                )
            })
            .collect();

        Self {
            tenants,
            tiers,
            precedence,
            policy,
            capacity,
        }
    }

    /// Builds the registry described by the tenancy configuration.
    pub fn from_config(config: &TenancyConfig) -> Self {
        Self::new(
            config.slots,
            config.capacity,
            config.policy,
            config.tiers.clone(),
            config.precedence,
        )
    }

    /// Number of tenant slots.
    pub fn slots(&self) -> u32 {
        self.tenants.len() as u32
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn get(&self, id: TenantId) -> Option<&Tenant> {
        self.tenants.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tenant> {
        self.tenants.values()
    }

    /// Quota of a tenant, 0 for unknown ids.
    pub fn quota(&self, id: TenantId) -> u32 {
        self.tenants.get(&id).map(|t| t.quota).unwrap_or(0)
    }

    /// Live rule count of a tenant, 0 for unknown ids.
    pub fn live_rules(&self, id: TenantId) -> u32 {
        self.tenants.get(&id).map(|t| t.live_rules).unwrap_or(0)
    }

    pub fn increment(&mut self, id: TenantId) {
        if let Some(tenant) = self.tenants.get_mut(&id) {
            tenant.live_rules = tenant.live_rules.saturating_add(1);
        }
    }

    /// Decrements the live count, never below zero.
    pub fn decrement(&mut self, id: TenantId) {
        if let Some(tenant) = self.tenants.get_mut(&id) {
            tenant.live_rules = tenant.live_rules.saturating_sub(1);
        }
    }

    /// Recomputes every quota. Live counts are kept as they are, so a tenant
    /// may end up above a shrunken quota. The engine still accepts deletes of
    /// rules it holds beyond the new range, and refuses adds until the count
    /// is back under the quota.
    pub fn reallocate(&mut self, policy: AllocationPolicy, capacity: u32) {
        let assignment: Vec<Option<usize>> = self.tenants.values().map(|t| t.tier).collect();
        let quotas = allocate(policy, capacity, &assignment, &self.tiers);

        for (tenant, quota) in self.tenants.values_mut().zip(quotas) {
            tenant.quota = quota;
        }
        self.policy = policy;
        self.capacity = capacity;
    }

    /// Picks the tenant that keeps a contested rule.
    ///
    /// The tenant in the higher-precedence tier wins; within one tier the
    /// higher id wins.
    pub fn resolve_owner(&self, a: TenantId, b: TenantId) -> TenantId {
        let tier_a = self.get(a).and_then(|t| t.tier);
        let tier_b = self.get(b).and_then(|t| t.tier);

        match self.compare_tiers(tier_a, tier_b) {
            Ordering::Greater => a,
            Ordering::Less => b,
            Ordering::Equal => a.max(b),
        }
    }

    /// `Greater` when `a` outranks `b`. Tierless tenants rank below everyone.
    fn compare_tiers(&self, a: Option<usize>, b: Option<usize>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => match self.precedence {
                TierPrecedence::LowestIndexFirst => b.cmp(&a),
                TierPrecedence::HighestIndexFirst => a.cmp(&b),
            },
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }

    /// Current allocation table, one row per tier.
    pub fn summary(&self) -> AllocationSummary {
        let tiers = self
            .tiers
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let quota = self
                    .tenants
                    .values()
                    .find(|t| t.tier == Some(index))
                    .map(|t| t.quota)
                    .unwrap_or(0);
                TierAllocation {
                    tier: index,
                    size: spec.size,
                    share: spec.share,
                    quota,
                }
            })
            .collect();

        AllocationSummary {
            policy: self.policy,
            capacity: self.capacity,
            slots: self.slots(),
            tiers,
        }
    }
}

/// Maps each slot to a tier: the first `tiers[0].size` ids go to tier 0 and
/// so on. Slots past the last tier get `None`.
fn assign_tiers(slots: u32, tiers: &[TierSpec]) -> Vec<Option<usize>> {
    let mut assignment = Vec::with_capacity(slots as usize);
    for (index, tier) in tiers.iter().enumerate() {
        for _ in 0..tier.size {
            if assignment.len() == slots as usize {
                return assignment;
            }
            assignment.push(Some(index));
        }
    }
    assignment.resize(slots as usize, None);
    assignment
}
