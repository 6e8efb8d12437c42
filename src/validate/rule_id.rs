//! Rule identifier validation.

use std::fmt;
use tracing::debug;

use super::{parse_decimal, ValidationError};
use crate::rule::RuleId;
use crate::tenant::TenantId;

/// Why a rule identifier was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleIdFault {
    /// Not exactly one `:` followed by one trailing `.`.
    Separators,
    NotNumeric,
    TenantMismatch,
    SequenceOutOfRange,
}

impl fmt::Display for RuleIdFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleIdFault::Separators => write!(f, "malformed separators"),
            RuleIdFault::NotNumeric => write!(f, "non-numeric part"),
            RuleIdFault::TenantMismatch => write!(f, "tenant part does not match the caller"),
            RuleIdFault::SequenceOutOfRange => write!(f, "rule number out of range"),
        }
    }
}

/// Accepts `"<tenant>:<sequence>."` where `<tenant>` is the caller and
/// `<sequence>` lies in `[1, quota]`.
pub fn parse_rule_id(value: &str, tenant: TenantId, quota: u32) -> Result<RuleId, ValidationError> {
    classify(value, tenant, quota).map_err(|reason| {
        debug!(value = %value, tenant = %tenant, %reason, "Rule id rejected");
        ValidationError::RuleId {
            value: value.to_string(),
            reason,
            limit: quota,
        }
    })
}

fn classify(value: &str, tenant: TenantId, quota: u32) -> Result<RuleId, RuleIdFault> {
    let body = value.strip_suffix('.').ok_or(RuleIdFault::Separators)?;
    if body.contains('.') {
        return Err(RuleIdFault::Separators);
    }
    let (tenant_part, sequence_part) = body.split_once(':').ok_or(RuleIdFault::Separators)?;
    if sequence_part.contains(':') {
        return Err(RuleIdFault::Separators);
    }

    let embedded = parse_decimal(tenant_part).ok_or(RuleIdFault::NotNumeric)?;
    let sequence = parse_decimal(sequence_part).ok_or(RuleIdFault::NotNumeric)?;

    if embedded != u64::from(tenant.get()) {
        return Err(RuleIdFault::TenantMismatch);
    }
    if sequence == 0 || sequence > u64::from(quota) {
        return Err(RuleIdFault::SequenceOutOfRange);
    }

    Ok(RuleId::new(tenant, sequence as u32))
}
