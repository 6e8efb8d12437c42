//! Configuration module for ruleward.
//!
//! Configuration is loaded from a YAML file and then overridden by
//! environment variables. Every section has defaults, so an empty file (or no
//! file at all) yields a working single-node engine.

mod logging;
mod retry;
mod server;
mod store;
mod tenancy;

pub use logging::{LogFormat, LogLevel, LogOutput, LoggingConfig};
pub use retry::{RetryConfig, TimeoutConfig};
pub use server::{AuthConfig, ServerConfig};
pub use store::{StoreBackend, StoreConfig};
pub use tenancy::{CredentialsConfig, TenancyConfig};

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Result, RulewardError};

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ruleward/config.yaml";

/// Environment variable for configuration file path.
pub const ENV_CONFIG_PATH: &str = "RULEWARD_CONFIG";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine instance name; defaults to the host name.
    pub name: Option<String>,

    /// HTTP server configuration.
    pub server: ServerConfig,

    /// Administrative authentication.
    pub auth: AuthConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Tenant slots, tiers and quota policy.
    pub tenancy: TenancyConfig,

    /// Tenant secrets.
    pub credentials: CredentialsConfig,

    /// Rule store backend.
    pub store: StoreConfig,

    /// Retry policy for store calls.
    pub retry: RetryConfig,

    /// Timeout configuration.
    pub timeout: TimeoutConfig,
}

impl Config {
    /// Loads configuration from the specified path.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RulewardError::config_with_source(
                format!("Failed to read config file: {}", path.display()),
                e,
            )
        })?;

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            RulewardError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML string.
    pub fn load_from_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| RulewardError::config_with_source("Failed to parse config", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration with the following priority:
    /// 1. Explicit path (if provided)
    /// 2. RULEWARD_CONFIG environment variable
    /// 3. Default path (/etc/ruleward/config.yaml)
    ///
    /// Returns default config if no file exists.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path);

        if path.exists() {
            let mut config = Self::load_from_path(&path)?;
            config.apply_env_overrides();
            config.validate()?;
            return Ok(config);
        } else if explicit_path.is_some() {
            return Err(RulewardError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn resolve_config_path(explicit_path: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit_path {
            return path.to_path_buf();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_PATH) {
            return PathBuf::from(env_path);
        }

        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    /// Applies environment variable overrides to the configuration.
    ///
    /// Values that fail to parse are ignored.
    pub fn apply_env_overrides(&mut self) {
        // Server settings
        if let Ok(bind) = env::var("RULEWARD_SERVER_BIND") {
            self.server.bind = bind;
        }
        if let Ok(port) = env::var("RULEWARD_SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        // Logging settings
        if let Ok(level) = env::var("RULEWARD_LOG_LEVEL") {
            if let Ok(level) = level.parse() {
                self.logging.level = level;
            }
        }
        if let Ok(format) = env::var("RULEWARD_LOG_FORMAT") {
            if let Ok(format) = format.parse() {
                self.logging.format = format;
            }
        }

        // Tenancy settings
        if let Ok(policy) = env::var("RULEWARD_ALLOCATION_POLICY") {
            if let Ok(policy) = policy.parse() {
                self.tenancy.policy = policy;
            }
        }
        if let Ok(capacity) = env::var("RULEWARD_CAPACITY") {
            if let Ok(capacity) = capacity.parse() {
                self.tenancy.capacity = capacity;
            }
        }

        // Admin token; setting it turns authentication on
        if let Ok(token) = env::var("RULEWARD_ADMIN_TOKEN") {
            if !token.is_empty() {
                self.auth.enabled = true;
                self.auth.token = Some(token);
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(RulewardError::config(
                "Server port must be between 1 and 65535",
            ));
        }

        if self.auth.enabled && self.auth.token.as_deref().map_or(true, str::is_empty) {
            return Err(RulewardError::config(
                "auth.token is required when auth is enabled",
            ));
        }

        let tenancy = &self.tenancy;
        if tenancy.slots == 0 {
            return Err(RulewardError::config("tenancy.slots must be > 0"));
        }

        let tier_slots: u64 = tenancy.tiers.iter().map(|t| u64::from(t.size)).sum();
        if tier_slots != u64::from(tenancy.slots) {
            return Err(RulewardError::config(format!(
                "tenancy.tiers sizes add up to {} but tenancy.slots is {}",
                tier_slots, tenancy.slots
            )));
        }

        let shares: u64 = tenancy.tiers.iter().map(|t| u64::from(t.share)).sum();
        if shares > 100 {
            return Err(RulewardError::config(format!(
                "tenancy.tiers shares add up to {}%, more than 100%",
                shares
            )));
        }

        if let Some(id) = self
            .credentials
            .secrets
            .keys()
            .find(|id| **id >= tenancy.slots)
        {
            return Err(RulewardError::config(format!(
                "credentials.secrets has an entry for tenant {} but only {} slots exist",
                id, tenancy.slots
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(RulewardError::config("retry.max_attempts must be > 0"));
        }

        if self.timeout.store_ms == 0 {
            return Err(RulewardError::config("timeout.store_ms must be > 0"));
        }

        Ok(())
    }

    /// Returns the engine name (configured name or hostname).
    pub fn engine_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::{AllocationPolicy, TierPrecedence, TierSpec};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn load_yaml(yaml: &str) -> Result<Config> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        Config::load_from_path(file.path())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(!config.auth.enabled);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.tenancy.slots, 400);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.timeout.store_ms, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_yaml() {
        let config = load_yaml(
            r#"
name: "edge-1"

server:
  bind: "127.0.0.1"
  port: 9090

logging:
  level: debug
  format: text
  output: stderr

tenancy:
  slots: 10
  capacity: 100
  policy: uniform
  precedence: highest_index_first
  tiers:
    - { size: 4, share: 60 }
    - { size: 6, share: 40 }

credentials:
  secrets:
    3: "three"
"#,
        )
        .unwrap();

        assert_eq!(config.engine_name(), "edge-1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.output, LogOutput::Stderr);
        assert_eq!(config.tenancy.policy, AllocationPolicy::Uniform);
        assert_eq!(
            config.tenancy.precedence,
            TierPrecedence::HighestIndexFirst
        );
        assert_eq!(
            config.tenancy.tiers,
            vec![TierSpec::new(4, 60), TierSpec::new(6, 40)]
        );
        assert_eq!(config.credentials.secrets.get(&3), Some(&"three".to_string()));
        assert!(!config.credentials.id_as_secret);
    }

    #[test]
    fn test_load_from_str_empty_is_default() {
        let config = Config::load_from_str("{}").unwrap();
        assert_eq!(config.tenancy.capacity, 4000);
    }

    #[test]
    fn test_validation_port_zero() {
        let err = load_yaml("server:\n  port: 0\n").unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_validation_auth_without_token() {
        let err = load_yaml("auth:\n  enabled: true\n").unwrap_err();
        assert!(err.to_string().contains("auth.token"));
    }

    #[test]
    fn test_validation_tier_sizes_must_cover_slots() {
        let err = load_yaml(
            r#"
tenancy:
  slots: 10
  tiers:
    - { size: 4, share: 50 }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("tenancy.tiers sizes"));
    }

    #[test]
    fn test_validation_shares_over_100() {
        let err = load_yaml(
            r#"
tenancy:
  slots: 2
  tiers:
    - { size: 1, share: 60 }
    - { size: 1, share: 50 }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("110%"));
    }

    #[test]
    fn test_validation_secret_outside_slots() {
        let err = load_yaml(
            r#"
credentials:
  secrets:
    400: "nope"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("tenant 400"));
    }

    #[test]
    fn test_validation_zero_attempts() {
        let err = load_yaml("retry:\n  max_attempts: 0\n").unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/nonexistent/ruleward.yaml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(err.exit_code(), crate::error::exit_code::CONFIG_ERROR);
    }

    #[test]
    fn test_config_serialization() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();

        assert!(yaml.contains("tenancy:"));
        assert!(yaml.contains("policy: tiered"));
        assert!(yaml.contains("precedence: lowest_index_first"));
    }

    #[test]
    fn test_engine_name_defaults_to_hostname() {
        let config = Config::default();
        assert!(!config.engine_name().is_empty());
    }
}
