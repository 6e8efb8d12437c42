//! Rule model.
//!
//! Field values are normalised once by the validators: actions and port
//! wildcards become closed enums, addresses become [`Cidr`] values. Everything
//! downstream compares these normalised forms.

pub mod inventory;

pub use inventory::{Conflict, RuleInventory};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::tenant::TenantId;

/// Number of fields compared by duplicate detection.
pub const MATCH_FIELDS: u8 = 6;

/// What a rule does with matching traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Deny,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Allow => write!(f, "ALLOW"),
            Action::Deny => write!(f, "DENY"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("allow") {
            Ok(Action::Allow)
        } else if s.eq_ignore_ascii_case("deny") {
            Ok(Action::Deny)
        } else {
            Err(format!("Invalid action: {}", s))
        }
    }
}

/// A transport port or the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    /// Matches every port.
    Any,
    Number(u16),
}

impl Port {
    /// Literal equality, or either side is the wildcard.
    pub fn matches(&self, other: &Port) -> bool {
        matches!((self, other), (Port::Any, _) | (_, Port::Any)) || self == other
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Any => write!(f, "ANY"),
            Port::Number(port) => write!(f, "{}", port),
        }
    }
}

/// An IPv4 address with a prefix length.
///
/// Host bits are kept as submitted; two values are equal only when both the
/// address and the prefix are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    pub addr: Ipv4Addr,
    pub prefix: u8,
}

impl Cidr {
    pub const fn new(addr: Ipv4Addr, prefix: u8) -> Self {
        Self { addr, prefix }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

/// Rule identifier: the owning tenant plus a per-tenant sequence number.
///
/// Rendered as `"<tenant>:<sequence>."`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId {
    pub tenant: TenantId,
    pub sequence: u32,
}

impl RuleId {
    pub const fn new(tenant: TenantId, sequence: u32) -> Self {
        Self { tenant, sequence }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.", self.tenant, self.sequence)
    }
}

/// An access-control entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: RuleId,
    pub source: Cidr,
    pub destination: Cidr,
    pub source_port: Port,
    pub destination_port: Port,
    pub priority: i32,
    pub action: Action,
}

impl Rule {
    /// Tenant that owns this rule.
    pub fn owner(&self) -> TenantId {
        self.id.tenant
    }

    /// Counts matching fields among addresses, ports, priority and action.
    pub fn match_score(&self, other: &Rule) -> u8 {
        [
            self.source == other.source,
            self.destination == other.destination,
            self.source_port.matches(&other.source_port),
            self.destination_port.matches(&other.destination_port),
            self.priority == other.priority,
            self.action == other.action,
        ]
        .iter()
        .filter(|matched| **matched)
        .count() as u8
    }

    /// True when every compared field matches, whatever the identifiers.
    pub fn is_duplicate_of(&self, other: &Rule) -> bool {
        self.match_score(other) == MATCH_FIELDS
    }
}
