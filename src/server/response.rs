//! API response types and formatting.
//!
//! Every endpoint answers with [`ApiResponse`]. Rejected admissions carry
//! both `data` (the decision and counter the tenant needs) and `error`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{AdmissionResponse, Decision};
use crate::error::{ErrorCode, ErrorResponse, RulewardError};
use crate::tenant::{AllocationPolicy, Tenant};

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error information (present on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
    /// Response timestamp.
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    /// Creates a successful response with data.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a failed response with an error.
    pub fn error(error: ErrorResponse) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    /// Creates a failed response that still carries data.
    pub fn rejected(data: T, error: ErrorResponse) -> ApiResponse<T> {
        ApiResponse {
            success: false,
            data: Some(data),
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    /// Creates a failed response from a RulewardError.
    pub fn from_error(err: &RulewardError) -> ApiResponse<T> {
        Self::error(ErrorResponse::from_error(err))
    }
}

/// Health check response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthData {
    /// Health status.
    pub status: HealthStatus,
    /// Application version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Engine status response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusData {
    /// Engine information.
    pub engine: EngineInfo,
    /// Server information.
    pub server: ServerInfo,
    /// Statistics.
    pub stats: StatsInfo,
    /// Application version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Engine information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineInfo {
    /// Engine name.
    pub name: String,
    /// Rule store backend.
    pub store: String,
    /// Tenant slots.
    pub slots: u32,
    /// Rules currently admitted.
    pub rules: usize,
    /// Active allocation policy.
    pub policy: AllocationPolicy,
    /// Total rule capacity.
    pub capacity: u32,
}

/// Server information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Bind address.
    pub bind: String,
    /// Port number.
    pub port: u16,
}

/// Statistics information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsInfo {
    /// Admission requests received.
    pub requests_total: u64,
    /// Admissions accepted.
    pub requests_accepted: u64,
    /// Admissions rejected.
    pub requests_rejected: u64,
}

/// Admission outcome kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Accepted,
    Rejected,
}

/// Admission response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionData {
    /// Request ID.
    pub request_id: Uuid,
    /// Accepted or rejected.
    pub decision: DecisionKind,
    /// Human-readable outcome.
    pub message: String,
    /// Requester's live rule count, as a decimal string.
    pub counter: String,
    /// Rejection code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl AdmissionData {
    pub fn new(request_id: Uuid, response: &AdmissionResponse) -> Self {
        let (decision, code) = match &response.decision {
            Decision::Accepted(_) => (DecisionKind::Accepted, None),
            Decision::Rejected(err) => (DecisionKind::Rejected, Some(err.code())),
        };
        Self {
            request_id,
            decision,
            message: response.message(),
            counter: response.counter.to_string(),
            code,
        }
    }
}

/// Tenant response data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantData {
    /// Tenant id.
    pub id: u32,
    /// Precedence tier, absent for tenants outside every tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<usize>,
    /// Rule quota.
    pub quota: u32,
    /// Rules currently owned.
    pub live_rules: u32,
}

impl From<Tenant> for TenantData {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id.get(),
            tier: tenant.tier,
            quota: tenant.quota,
            live_rules: tenant.live_rules,
        }
    }
}

/// Reallocation request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// New allocation policy.
    pub policy: AllocationPolicy,
    /// New total capacity; the current one is kept when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}
