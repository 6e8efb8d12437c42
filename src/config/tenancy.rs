//! Tenant universe, quota policy and credential configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::tenant::{default_tiers, AllocationPolicy, TierPrecedence, TierSpec};

/// Tenant slots and how rule capacity is divided between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Number of tenant slots; ids run from 0 to `slots - 1`.
    pub slots: u32,

    /// Total number of rules shared by all tenants.
    pub capacity: u32,

    /// Quota allocation policy.
    pub policy: AllocationPolicy,

    /// Which end of `tiers` wins ownership arbitration.
    pub precedence: TierPrecedence,

    /// Precedence tiers, filled contiguously by tenant id.
    pub tiers: Vec<TierSpec>,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            slots: 400,
            capacity: 4000,
            policy: AllocationPolicy::default(),
            precedence: TierPrecedence::default(),
            tiers: default_tiers(),
        }
    }
}

/// Tenant secrets.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Secret per tenant id.
    pub secrets: HashMap<u32, String>,

    /// Let tenants without an entry authenticate with their decimal id.
    pub id_as_secret: bool,
}

impl CredentialsConfig {
    /// Whether any tenant can authenticate at all.
    pub fn admits_any_tenant(&self) -> bool {
        self.id_as_secret || !self.secrets.is_empty()
    }
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("secrets", &self.secrets.len())
            .field("id_as_secret", &self.id_as_secret)
            .finish()
    }
}
