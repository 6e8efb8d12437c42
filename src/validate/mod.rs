//! Request field validators.
//!
//! Each validator parses one raw field into its typed form or reports why it
//! could not. [`validate_request`] runs them in a fixed order and stops at the
//! first failure.

mod address;
mod port;
mod rule_id;

pub use address::{parse_cidr, AddressFault};
pub use port::parse_port;
pub use rule_id::{parse_rule_id, RuleIdFault};

use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::engine::{AdmissionRequest, Operation};
use crate::error::ErrorCode;
use crate::rule::{Action, Rule};
use crate::tenant::{CredentialTable, TenantId};

/// Request field a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TenantId,
    Secret,
    Operation,
    RuleId,
    SourceIp,
    DestinationIp,
    SourcePort,
    DestinationPort,
    Action,
}

impl Field {
    /// Wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::TenantId => "tenant_id",
            Field::Secret => "secret",
            Field::Operation => "operation",
            Field::RuleId => "rule_id",
            Field::SourceIp => "source_ip",
            Field::DestinationIp => "destination_ip",
            Field::SourcePort => "source_port",
            Field::DestinationPort => "destination_port",
            Field::Action => "action",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Field::TenantId => "Tenant id",
            Field::Secret => "Secret",
            Field::Operation => "Operation",
            Field::RuleId => "Rule id",
            Field::SourceIp => "Source IP",
            Field::DestinationIp => "Destination IP",
            Field::SourcePort => "Source port",
            Field::DestinationPort => "Destination port",
            Field::Action => "Action",
        };
        f.write_str(label)
    }
}

/// A structural validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Tenant id '{value}' is invalid: expected a number between 0 and {max}. Try again!")]
    TenantId { value: String, max: u32 },

    #[error("Secret is not correct for tenant {tenant}. Try again!")]
    Credential { tenant: TenantId },

    #[error("Operation {value} is invalid: use 0 to add a rule and 1 to delete one. Try again!")]
    Operation { value: i64 },

    #[error(
        "Rule id '{value}' is invalid ({reason}): expected X:Y. where X is the tenant id and Y is a rule number between 1 and {limit}."
    )]
    RuleId {
        value: String,
        reason: RuleIdFault,
        limit: u32,
    },

    #[error("{field} '{value}' is invalid ({reason}): expected X.X.X.X/N with N between 8 and 32.")]
    Address {
        field: Field,
        value: String,
        reason: AddressFault,
    },

    #[error("{field} '{value}' is invalid: expected ANY, NONE or a number between 1025 and 65534.")]
    Port { field: Field, value: String },

    #[error("Action '{value}' is invalid: the action can only be ALLOW or DENY.")]
    Action { value: String },
}

impl ValidationError {
    /// The offending request field.
    pub fn field(&self) -> Field {
        match self {
            ValidationError::TenantId { .. } => Field::TenantId,
            ValidationError::Credential { .. } => Field::Secret,
            ValidationError::Operation { .. } => Field::Operation,
            ValidationError::RuleId { .. } => Field::RuleId,
            ValidationError::Address { field, .. } | ValidationError::Port { field, .. } => *field,
            ValidationError::Action { .. } => Field::Action,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ValidationError::TenantId { .. } => ErrorCode::InvalidTenantId,
            ValidationError::Credential { .. } => ErrorCode::InvalidCredential,
            ValidationError::Operation { .. } => ErrorCode::InvalidOperation,
            ValidationError::RuleId { .. } => ErrorCode::InvalidRuleId,
            ValidationError::Address { .. } => ErrorCode::InvalidAddress,
            ValidationError::Port { .. } => ErrorCode::InvalidPort,
            ValidationError::Action { .. } => ErrorCode::InvalidAction,
        }
    }
}

/// Parses a non-empty run of ASCII digits.
///
/// Signs, whitespace and anything that would overflow `u64` are rejected.
pub(crate) fn parse_decimal(s: &str) -> Option<u64> {
    if s.is_empty() || s.len() > 19 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Accepts an integer in `[0, slots - 1]`.
pub fn parse_tenant_id(value: &str, slots: u32) -> Result<TenantId, ValidationError> {
    match parse_decimal(value) {
        Some(id) if id < u64::from(slots) => Ok(TenantId::new(id as u32)),
        _ => {
            debug!(value = %value, "Tenant id rejected");
            Err(ValidationError::TenantId {
                value: value.to_string(),
                max: slots.saturating_sub(1),
            })
        }
    }
}

/// Accepts exactly 0 (add) or 1 (delete).
pub fn parse_operation(value: i64) -> Result<Operation, ValidationError> {
    Operation::from_code(value).ok_or_else(|| {
        debug!(value, "Operation rejected");
        ValidationError::Operation { value }
    })
}

/// Accepts `allow` or `deny` in any casing.
pub fn parse_action(value: &str) -> Result<Action, ValidationError> {
    value.parse().map_err(|_| {
        debug!(value = %value, "Action rejected");
        ValidationError::Action {
            value: value.to_string(),
        }
    })
}

/// Accepts the secret provisioned for `tenant`.
pub fn check_credential(
    credentials: &CredentialTable,
    tenant: TenantId,
    secret: &str,
) -> Result<(), ValidationError> {
    if credentials.verify(tenant, secret) {
        Ok(())
    } else {
        debug!(tenant = %tenant, "Credential rejected");
        Err(ValidationError::Credential { tenant })
    }
}

/// Validates every rule-bearing field of a request from an authenticated
/// tenant.
///
/// Order: operation, rule id, source IP, destination IP, source port,
/// destination port, action. Only the first failure is reported.
pub fn validate_request(
    request: &AdmissionRequest,
    tenant: TenantId,
    quota: u32,
) -> Result<(Operation, Rule), ValidationError> {
    let operation = parse_operation(request.operation)?;
    let id = parse_rule_id(&request.rule_id, tenant, quota)?;
    let source = parse_cidr(&request.source_ip, Field::SourceIp)?;
    let destination = parse_cidr(&request.destination_ip, Field::DestinationIp)?;
    let source_port = parse_port(&request.source_port, Field::SourcePort)?;
    let destination_port = parse_port(&request.destination_port, Field::DestinationPort)?;
    let action = parse_action(&request.action)?;

    Ok((
        operation,
        Rule {
            id,
            source,
            destination,
            source_port,
            destination_port,
            priority: request.priority,
            action,
        },
    ))
}
