//! Server and administrative authentication configuration.

use serde::{Deserialize, Serialize};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,

    /// Listen port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Bearer token guarding administrative routes.
///
/// Tenant requests authenticate with their own secrets and never see this.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require the token on administrative routes.
    pub enabled: bool,

    /// Static bearer token.
    pub token: Option<String>,
}

impl AuthConfig {
    /// Checks an `Authorization` header value.
    ///
    /// Always true when authentication is disabled.
    pub fn authorizes(&self, header: Option<&str>) -> bool {
        if !self.enabled {
            return true;
        }
        match (&self.token, header.and_then(|h| h.strip_prefix("Bearer "))) {
            (Some(expected), Some(presented)) => expected == presented,
            _ => false,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
