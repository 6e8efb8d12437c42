//! Inbound admission request.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw request fields as submitted by a tenant.
///
/// Everything except `operation` and `priority` arrives as text and is parsed
/// by the validators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRequest {
    pub tenant_id: String,
    pub secret: String,
    /// 0 adds, 1 deletes.
    pub operation: i64,
    pub rule_id: String,
    pub source_ip: String,
    pub destination_ip: String,
    pub source_port: String,
    pub destination_port: String,
    pub priority: i32,
    pub action: String,
}

/// What the request asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Delete,
}

impl Operation {
    /// Wire code of the operation.
    pub fn code(&self) -> i64 {
        match self {
            Operation::Add => 0,
            Operation::Delete => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Operation::Add),
            1 => Some(Operation::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => write!(f, "add"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}
