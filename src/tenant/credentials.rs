//! Per-tenant shared secrets.

use std::collections::HashMap;

use super::TenantId;
use crate::config::CredentialsConfig;

/// Secrets fixed at start-up, used only for equality checks.
#[derive(Clone, Default)]
pub struct CredentialTable {
    secrets: HashMap<TenantId, String>,
    id_as_secret: bool,
}

impl CredentialTable {
    pub fn new(secrets: HashMap<TenantId, String>, id_as_secret: bool) -> Self {
        Self {
            secrets,
            id_as_secret,
        }
    }

    pub fn from_config(config: &CredentialsConfig) -> Self {
        let secrets = config
            .secrets
            .iter()
            .map(|(id, secret)| (TenantId::new(*id), secret.clone()))
            .collect();
        Self::new(secrets, config.id_as_secret)
    }

    /// Checks a submitted secret against the tenant's stored one.
    ///
    /// With `id_as_secret` a tenant without an explicit entry authenticates
    /// with its decimal id.
    pub fn verify(&self, tenant: TenantId, secret: &str) -> bool {
        match self.secrets.get(&tenant) {
            Some(stored) => stored == secret,
            None if self.id_as_secret => secret == tenant.to_string(),
            None => false,
        }
    }
}

// Secrets stay out of debug output.
impl std::fmt::Debug for CredentialTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialTable")
            .field("secrets", &self.secrets.len())
            .field("id_as_secret", &self.id_as_secret)
            .finish()
    }
}
