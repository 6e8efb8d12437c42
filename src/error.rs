//! Error types and error handling for ruleward.
//!
//! Two families live here. [`RulewardError`] covers process faults such as
//! configuration problems, store backends that stop answering, and client
//! connection failures. [`AdmissionError`] is the rejection taxonomy of the
//! admission pipeline: every member is reported back to the submitting tenant
//! as a response message and never escapes the engine as a fault.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::tenant::TenantId;
use crate::validate::ValidationError;

/// Error codes exposed over the API.
/// Each error has a unique code for identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// E001: Configuration file is invalid
    #[serde(rename = "E001")]
    ConfigInvalid,

    /// E002: Tenant id is not a known slot
    #[serde(rename = "E002")]
    InvalidTenantId,

    /// E003: Tenant secret does not match
    #[serde(rename = "E003")]
    InvalidCredential,

    /// E004: Operation code is neither add nor delete
    #[serde(rename = "E004")]
    InvalidOperation,

    /// E005: Rule identifier is malformed or out of quota range
    #[serde(rename = "E005")]
    InvalidRuleId,

    /// E006: Source or destination address is malformed
    #[serde(rename = "E006")]
    InvalidAddress,

    /// E007: Source or destination port is malformed
    #[serde(rename = "E007")]
    InvalidPort,

    /// E008: Action is neither allow nor deny
    #[serde(rename = "E008")]
    InvalidAction,

    /// E009: Rule identifier already exists
    #[serde(rename = "E009")]
    AlreadyExists,

    /// E010: A semantically identical rule already exists
    #[serde(rename = "E010")]
    DuplicateRule,

    /// E011: Tenant has no remaining quota
    #[serde(rename = "E011")]
    QuotaExceeded,

    /// E012: Rule identifier does not exist
    #[serde(rename = "E012")]
    RuleNotFound,

    /// E013: Rule store failed or timed out
    #[serde(rename = "E013")]
    StoreUnavailable,

    /// E014: Failed to connect to a remote engine
    #[serde(rename = "E014")]
    ConnectionError,

    /// E015: Request is invalid
    #[serde(rename = "E015")]
    InvalidRequest,

    /// E016: Administrative authentication failed
    #[serde(rename = "E016")]
    AuthFailed,
}

impl ErrorCode {
    /// Returns the error code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalid => "E001",
            ErrorCode::InvalidTenantId => "E002",
            ErrorCode::InvalidCredential => "E003",
            ErrorCode::InvalidOperation => "E004",
            ErrorCode::InvalidRuleId => "E005",
            ErrorCode::InvalidAddress => "E006",
            ErrorCode::InvalidPort => "E007",
            ErrorCode::InvalidAction => "E008",
            ErrorCode::AlreadyExists => "E009",
            ErrorCode::DuplicateRule => "E010",
            ErrorCode::QuotaExceeded => "E011",
            ErrorCode::RuleNotFound => "E012",
            ErrorCode::StoreUnavailable => "E013",
            ErrorCode::ConnectionError => "E014",
            ErrorCode::InvalidRequest => "E015",
            ErrorCode::AuthFailed => "E016",
        }
    }

    /// Returns the default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalid => "Configuration file is invalid",
            ErrorCode::InvalidTenantId => "Tenant id is invalid",
            ErrorCode::InvalidCredential => "Secret is not correct",
            ErrorCode::InvalidOperation => "Operation is invalid",
            ErrorCode::InvalidRuleId => "Rule id is invalid",
            ErrorCode::InvalidAddress => "Address is invalid",
            ErrorCode::InvalidPort => "Port is invalid",
            ErrorCode::InvalidAction => "Action is invalid",
            ErrorCode::AlreadyExists => "Rule already exists",
            ErrorCode::DuplicateRule => "Rule duplicates an existing rule",
            ErrorCode::QuotaExceeded => "Tenant quota exhausted",
            ErrorCode::RuleNotFound => "Rule does not exist",
            ErrorCode::StoreUnavailable => "Rule store is unavailable",
            ErrorCode::ConnectionError => "Failed to connect to remote engine",
            ErrorCode::InvalidRequest => "Request is invalid",
            ErrorCode::AuthFailed => "Authentication failed",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::ConfigInvalid => 500,
            ErrorCode::InvalidTenantId
            | ErrorCode::InvalidOperation
            | ErrorCode::InvalidRuleId
            | ErrorCode::InvalidAddress
            | ErrorCode::InvalidPort
            | ErrorCode::InvalidAction
            | ErrorCode::InvalidRequest => 400,
            ErrorCode::InvalidCredential | ErrorCode::AuthFailed => 401,
            ErrorCode::AlreadyExists | ErrorCode::DuplicateRule | ErrorCode::QuotaExceeded => 409,
            ErrorCode::RuleNotFound => 404,
            ErrorCode::StoreUnavailable => 503,
            ErrorCode::ConnectionError => 502,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// CLI exit codes.
pub mod exit_code {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// General error
    pub const GENERAL_ERROR: i32 = 1;
    /// Configuration error
    pub const CONFIG_ERROR: i32 = 2;
    /// Connection error
    pub const CONNECTION_ERROR: i32 = 3;
    /// Timeout error
    pub const TIMEOUT_ERROR: i32 = 4;
    /// Authentication error
    pub const AUTH_ERROR: i32 = 5;
    /// The engine rejected the submitted request
    pub const REJECTED: i32 = 6;
    /// Command line argument error
    pub const CLI_ERROR: i32 = 64;
}

/// Process-level faults.
#[derive(Debug, Error)]
pub enum RulewardError {
    /// Configuration file is invalid or cannot be loaded.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The rule store failed an operation.
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("Timeout: {operation} (waited {millis}ms)")]
    Timeout { operation: String, millis: u64 },

    /// Failed to connect to a remote engine.
    #[error("Connection error: {target}")]
    Connection {
        target: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Administrative authentication failed.
    #[error("Authentication failed: {reason}")]
    AuthFailed { reason: String },

    /// Request is invalid.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// A remote engine answered with an error body.
    #[error("{code}: {message}")]
    Remote { code: ErrorCode, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RulewardError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RulewardError::Config { .. } => ErrorCode::ConfigInvalid,
            RulewardError::Store { .. } => ErrorCode::StoreUnavailable,
            RulewardError::Timeout { .. } => ErrorCode::StoreUnavailable,
            RulewardError::Connection { .. } => ErrorCode::ConnectionError,
            RulewardError::AuthFailed { .. } => ErrorCode::AuthFailed,
            RulewardError::InvalidRequest { .. } => ErrorCode::InvalidRequest,
            RulewardError::Remote { code, .. } => *code,
            RulewardError::Io(_) => ErrorCode::StoreUnavailable,
            RulewardError::Yaml(_) => ErrorCode::ConfigInvalid,
            RulewardError::Json(_) => ErrorCode::InvalidRequest,
        }
    }

    /// Returns the CLI exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RulewardError::Config { .. } | RulewardError::Yaml(_) => exit_code::CONFIG_ERROR,
            RulewardError::Connection { .. } => exit_code::CONNECTION_ERROR,
            RulewardError::Timeout { .. } => exit_code::TIMEOUT_ERROR,
            RulewardError::AuthFailed { .. } => exit_code::AUTH_ERROR,
            RulewardError::Remote { code, .. } if *code == ErrorCode::AuthFailed => {
                exit_code::AUTH_ERROR
            }
            RulewardError::Remote { .. } => exit_code::REJECTED,
            _ => exit_code::GENERAL_ERROR,
        }
    }

    /// Creates a configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        RulewardError::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error with a message and source.
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RulewardError::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a store error with a message.
    pub fn store(message: impl Into<String>) -> Self {
        RulewardError::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a connection error with a source.
    pub fn connection_with_source(
        target: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        RulewardError::Connection {
            target: target.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        RulewardError::InvalidRequest {
            message: message.into(),
        }
    }
}

/// Rejection reasons produced by the admission pipeline.
///
/// The `Display` output is the message returned to the submitting tenant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// A request field failed structural validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The identifier is already present in the rule store.
    #[error("Rule {rule_id} for tenant {tenant} already exists.")]
    AlreadyExists { rule_id: String, tenant: TenantId },

    /// A semantic duplicate exists and arbitration favours its owner.
    #[error("The rule exists for tenant {owner} as {existing}.")]
    DuplicateOwnedByOther { owner: TenantId, existing: String },

    /// The requester already owns a semantic duplicate under another identifier.
    #[error("The rule exists for tenant {owner} as {existing}.")]
    DuplicateOfOwnRule { owner: TenantId, existing: String },

    /// The tenant's live count has reached its quota.
    #[error("Tenant {tenant} has reached its quota of {limit} rules.")]
    QuotaExceeded { tenant: TenantId, limit: u32 },

    /// Delete requested for an identifier absent from the store.
    #[error("Rule {rule_id} for tenant {tenant} does not exist.")]
    NotFound { rule_id: String, tenant: TenantId },

    /// The rule store failed or timed out.
    #[error("Rule store is unavailable: {reason}. Try again later.")]
    StoreUnavailable { reason: String },
}

impl AdmissionError {
    /// Returns the error code for this rejection.
    pub fn code(&self) -> ErrorCode {
        match self {
            AdmissionError::Invalid(err) => err.code(),
            AdmissionError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            AdmissionError::DuplicateOwnedByOther { .. }
            | AdmissionError::DuplicateOfOwnRule { .. } => ErrorCode::DuplicateRule,
            AdmissionError::QuotaExceeded { .. } => ErrorCode::QuotaExceeded,
            AdmissionError::NotFound { .. } => ErrorCode::RuleNotFound,
            AdmissionError::StoreUnavailable { .. } => ErrorCode::StoreUnavailable,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdmissionError::StoreUnavailable { .. })
    }
}

impl From<RulewardError> for AdmissionError {
    fn from(err: RulewardError) -> Self {
        AdmissionError::StoreUnavailable {
            reason: err.to_string(),
        }
    }
}

/// Error details for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Additional context fields.
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl ErrorDetails {
    /// Creates empty error details.
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Adds a field to the error details.
    pub fn with_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl Default for ErrorDetails {
    fn default() -> Self {
        Self::new()
    }
}

/// Error response structure for the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "E001").
    pub code: ErrorCode,

    /// Human-readable error message.
    pub message: String,

    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

impl ErrorResponse {
    /// Creates a new error response.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an error response from a RulewardError.
    pub fn from_error(error: &RulewardError) -> Self {
        let details = match error {
            RulewardError::Timeout { operation, millis } => Some(
                ErrorDetails::new()
                    .with_field("operation", operation.clone())
                    .with_field("timeout_ms", *millis),
            ),
            RulewardError::Connection { target, .. } => {
                Some(ErrorDetails::new().with_field("target", target.clone()))
            }
            _ => None,
        };

        Self {
            code: error.code(),
            message: error.to_string(),
            details,
        }
    }

    /// Creates an error response from an admission rejection.
    pub fn from_rejection(rejection: &AdmissionError) -> Self {
        let details = match rejection {
            AdmissionError::Invalid(err) => {
                Some(ErrorDetails::new().with_field("field", err.field().as_str()))
            }
            AdmissionError::DuplicateOwnedByOther { owner, existing }
            | AdmissionError::DuplicateOfOwnRule { owner, existing } => Some(
                ErrorDetails::new()
                    .with_field("owner", owner.get())
                    .with_field("existing_rule_id", existing.clone()),
            ),
            AdmissionError::QuotaExceeded { limit, .. } => {
                Some(ErrorDetails::new().with_field("limit", *limit))
            }
            AdmissionError::StoreUnavailable { .. } => {
                Some(ErrorDetails::new().with_field("retryable", true))
            }
            _ => None,
        };

        Self {
            code: rejection.code(),
            message: rejection.to_string(),
            details,
        }
    }
}

/// Result type alias for ruleward operations.
pub type Result<T> = std::result::Result<T, RulewardError>;
