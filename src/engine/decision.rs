//! Admission outcomes.

use std::fmt;

use crate::error::AdmissionError;
use crate::rule::RuleId;
use crate::tenant::TenantId;

/// How an accepted request changed the rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    /// A new rule was stored.
    Stored { rule_id: RuleId },
    /// A duplicate owned by a lower-precedence tenant moved to the requester.
    Migrated {
        rule_id: RuleId,
        previous_owner: TenantId,
        previous_rule_id: RuleId,
    },
    /// The rule was removed.
    Deleted { rule_id: RuleId },
}

impl Acceptance {
    pub fn rule_id(&self) -> RuleId {
        match self {
            Acceptance::Stored { rule_id }
            | Acceptance::Migrated { rule_id, .. }
            | Acceptance::Deleted { rule_id } => *rule_id,
        }
    }
}

impl fmt::Display for Acceptance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Acceptance::Stored { rule_id } => {
                write!(f, "Rule {} for tenant {} stored.", rule_id, rule_id.tenant)
            }
            Acceptance::Migrated {
                rule_id,
                previous_owner,
                previous_rule_id,
            } => write!(
                f,
                "Rule {} for tenant {} stored. It replaces rule {} of tenant {}.",
                rule_id, rule_id.tenant, previous_rule_id, previous_owner
            ),
            Acceptance::Deleted { rule_id } => {
                write!(f, "Rule {} for tenant {} deleted.", rule_id, rule_id.tenant)
            }
        }
    }
}

/// Result of one admission transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accepted(Acceptance),
    Rejected(AdmissionError),
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted(_))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Accepted(acceptance) => acceptance.fmt(f),
            Decision::Rejected(rejection) => rejection.fmt(f),
        }
    }
}

impl From<AdmissionError> for Decision {
    fn from(err: AdmissionError) -> Self {
        Decision::Rejected(err)
    }
}

/// Decision plus the requester's live rule count after the transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionResponse {
    pub decision: Decision,
    /// 0 when the tenant id or secret was rejected.
    pub counter: u32,
}

impl AdmissionResponse {
    /// The human-readable outcome.
    pub fn message(&self) -> String {
        self.decision.to_string()
    }

    pub fn rejection(&self) -> Option<&AdmissionError> {
        match &self.decision {
            Decision::Rejected(err) => Some(err),
            Decision::Accepted(_) => None,
        }
    }
}
