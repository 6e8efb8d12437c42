//! Rule quota allocation.
//!
//! Quotas are a pure function of the allocation policy, the total rule
//! capacity and each tenant's tier. Nothing here is incremental: callers
//! recompute the full table whenever one of the inputs changes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RulewardError;

/// How the total rule capacity is split between tenants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationPolicy {
    /// Every tenant receives the same share.
    Uniform,
    /// Capacity is split between precedence tiers by percentage share.
    #[default]
    Tiered,
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationPolicy::Uniform => write!(f, "uniform"),
            AllocationPolicy::Tiered => write!(f, "tiered"),
        }
    }
}

impl FromStr for AllocationPolicy {
    type Err = RulewardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uniform" | "fair" => Ok(AllocationPolicy::Uniform),
            "tiered" | "role" => Ok(AllocationPolicy::Tiered),
            _ => Err(RulewardError::config(format!(
                "Unknown allocation policy: {}",
                s
            ))),
        }
    }
}

/// A precedence tier: how many tenants it holds and its percentage of capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Number of tenant slots in this tier.
    pub size: u32,
    /// Percentage of total capacity reserved for this tier.
    pub share: u32,
}

impl TierSpec {
    pub const fn new(size: u32, share: u32) -> Self {
        Self { size, share }
    }
}

/// The stock 200/100/100 tenant split with a 50/30/20 capacity split.
pub fn default_tiers() -> Vec<TierSpec> {
    vec![
        TierSpec::new(200, 50),
        TierSpec::new(100, 30),
        TierSpec::new(100, 20),
    ]
}

/// Capacity reserved for a tier: `floor(total * share / 100)`.
pub fn tier_capacity(total_capacity: u32, tier: &TierSpec) -> u32 {
    (u64::from(total_capacity) * u64::from(tier.share) / 100) as u32
}

/// Per-tenant quota inside a tier: `floor(tier_capacity / size)`.
pub fn tier_quota(total_capacity: u32, tier: &TierSpec) -> u32 {
    if tier.size == 0 {
        return 0;
    }
    tier_capacity(total_capacity, tier) / tier.size
}

/// Computes the quota of every tenant.
///
/// `tenant_tiers[i]` is the tier index of the i-th tenant. Under the tiered
/// policy a tenant whose tier is `None` or not present in `tiers` gets 0.
pub fn allocate(
    policy: AllocationPolicy,
    total_capacity: u32,
    tenant_tiers: &[Option<usize>],
    tiers: &[TierSpec],
) -> Vec<u32> {
    match policy {
        AllocationPolicy::Uniform => {
            if tenant_tiers.is_empty() {
                return Vec::new();
            }
            let quota = (u64::from(total_capacity) / tenant_tiers.len() as u64) as u32;
            vec![quota; tenant_tiers.len()]
        }
        AllocationPolicy::Tiered => {
            let per_tier: Vec<u32> = tiers
                .iter()
                .map(|tier| tier_quota(total_capacity, tier))
                .collect();

            tenant_tiers
                .iter()
                .map(|tier| {
                    tier.and_then(|index| per_tier.get(index).copied())
                        .unwrap_or(0)
                })
                .collect()
        }
    }
}

/// Allocation table as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSummary {
    /// Active policy.
    pub policy: AllocationPolicy,
    /// Total rule capacity.
    pub capacity: u32,
    /// Number of tenant slots.
    pub slots: u32,
    /// Per-tier breakdown.
    pub tiers: Vec<TierAllocation>,
}

/// Quota granted to each tenant of one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierAllocation {
    /// Tier index.
    pub tier: usize,
    /// Tenants in the tier.
    pub size: u32,
    /// Configured capacity share (percent).
    pub share: u32,
    /// Per-tenant quota.
    pub quota: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers_of(sizes: &[u32]) -> Vec<Option<usize>> {
        sizes
            .iter()
            .enumerate()
            .flat_map(|(index, size)| std::iter::repeat(Some(index)).take(*size as usize))
            .collect()
    }

    #[test]
    fn test_uniform_allocation() {
        let tenants = tiers_of(&[200, 100, 100]);
        let quotas = allocate(AllocationPolicy::Uniform, 4000, &tenants, &default_tiers());

        assert_eq!(quotas.len(), 400);
        assert!(quotas.iter().all(|q| *q == 10));
    }

    #[test]
    fn test_uniform_allocation_floors() {
        let tenants = vec![Some(0); 3];
        let quotas = allocate(AllocationPolicy::Uniform, 10, &tenants, &default_tiers());
        assert_eq!(quotas, vec![3, 3, 3]);
    }

    #[test]
    fn test_tiered_allocation_defaults() {
        let tenants = tiers_of(&[200, 100, 100]);
        let quotas = allocate(AllocationPolicy::Tiered, 4000, &tenants, &default_tiers());

        assert_eq!(quotas[0], 10);
        assert_eq!(quotas[199], 10);
        assert_eq!(quotas[200], 12);
        assert_eq!(quotas[299], 12);
        assert_eq!(quotas[300], 8);
        assert_eq!(quotas[399], 8);
    }

    #[test]
    fn test_unknown_tier_gets_nothing() {
        let tenants = vec![Some(0), None, Some(7)];
        let quotas = allocate(AllocationPolicy::Tiered, 4000, &tenants, &default_tiers());
        assert_eq!(quotas, vec![10, 0, 0]);
    }

    #[test]
    fn test_tiered_never_over_allocates() {
        let tiers = vec![
            TierSpec::new(7, 50),
            TierSpec::new(3, 33),
            TierSpec::new(11, 17),
        ];
        let tenants = tiers_of(&[7, 3, 11]);

        for capacity in [0, 1, 99, 100, 1234, 4000, 65_537, u32::MAX] {
            let quotas = allocate(AllocationPolicy::Tiered, capacity, &tenants, &tiers);
            for (index, tier) in tiers.iter().enumerate() {
                let quota = quotas[tenants.iter().position(|t| *t == Some(index)).unwrap()];
                assert!(
                    u64::from(quota) * u64::from(tier.size)
                        <= u64::from(tier_capacity(capacity, tier)),
                    "tier {} over-allocated at capacity {}",
                    index,
                    capacity
                );
            }
        }
    }

    #[test]
    fn test_empty_tier_quota_is_zero() {
        assert_eq!(tier_quota(4000, &TierSpec::new(0, 50)), 0);
    }

    #[test]
    fn test_allocation_policy_parse() {
        assert_eq!(
            "uniform".parse::<AllocationPolicy>().unwrap(),
            AllocationPolicy::Uniform
        );
        assert_eq!(
            "TIERED".parse::<AllocationPolicy>().unwrap(),
            AllocationPolicy::Tiered
        );
        assert!("optimal".parse::<AllocationPolicy>().is_err());
    }
}
