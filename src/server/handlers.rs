//! HTTP request handlers.
//!
//! This module contains all the HTTP endpoint handlers for the ruleward API.

use crate::engine::{AdmissionRequest, Decision};
use crate::error::{ErrorCode, ErrorResponse, RulewardError};
use crate::server::response::{
    AdmissionData, AllocationRequest, ApiResponse, EngineInfo, HealthData, HealthStatus,
    ServerInfo, StatsInfo, StatusData, TenantData,
};
use crate::server::state::AppState;
use crate::tenant::AllocationSummary;
use crate::validate::parse_tenant_id;
use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Version string for the application.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Health check handler.
///
/// GET /api/v1/health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let data = HealthData {
        status: HealthStatus::Healthy,
        version: VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// Engine status handler.
///
/// GET /api/v1/status
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats_snapshot = state.stats.snapshot();
    let engine = &state.engine;
    let summary = engine.summary().await;

    let data = StatusData {
        engine: EngineInfo {
            name: engine.name().to_string(),
            store: engine.store_name().to_string(),
            slots: engine.slots(),
            rules: engine.rule_count().await,
            policy: summary.policy,
            capacity: summary.capacity,
        },
        server: ServerInfo {
            bind: state.server_bind.clone(),
            port: state.server_port,
        },
        stats: StatsInfo {
            requests_total: stats_snapshot.requests_total,
            requests_accepted: stats_snapshot.requests_accepted,
            requests_rejected: stats_snapshot.requests_rejected,
        },
        version: VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// Admission handler - runs one add or delete request through the engine.
///
/// POST /api/v1/rules
pub async fn submit_rule(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdmissionRequest>,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4();

    info!(
        request_id = %request_id,
        tenant = %request.tenant_id,
        rule_id = %request.rule_id,
        operation = request.operation,
        "Processing admission request"
    );

    let response = state.engine.submit(&request).await;
    let data = AdmissionData::new(request_id, &response);

    match &response.decision {
        Decision::Accepted(_) => {
            state.record(true);
            (StatusCode::OK, Json(ApiResponse::success(data)))
        }
        Decision::Rejected(rejection) => {
            state.record(false);
            let status_code = StatusCode::from_u16(rejection.code().http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status_code,
                Json(ApiResponse::rejected(
                    data,
                    ErrorResponse::from_rejection(rejection),
                )),
            )
        }
    }
}

/// Tenant detail handler.
///
/// GET /api/v1/tenants/:id
pub async fn get_tenant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let tenant = match parse_tenant_id(&id, state.engine.slots()) {
        Ok(tenant) => state.engine.tenant(tenant).await,
        Err(_) => None,
    };

    match tenant {
        Some(tenant) => (
            StatusCode::OK,
            Json(ApiResponse::success(TenantData::from(tenant))),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<TenantData>::error(ErrorResponse::new(
                ErrorCode::InvalidTenantId,
                format!("Tenant {} does not exist", id),
            ))),
        ),
    }
}

/// Allocation table handler.
///
/// GET /api/v1/allocation
pub async fn get_allocation(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse::success(state.engine.summary().await)),
    )
}

/// Reallocation handler - recomputes every tenant quota.
///
/// PUT /api/v1/allocation
pub async fn reallocate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AllocationRequest>,
) -> impl IntoResponse {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if !state.auth.authorizes(header) {
        warn!("Reallocation refused: missing or wrong bearer token");
        let err = RulewardError::AuthFailed {
            reason: "missing or invalid bearer token".to_string(),
        };
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<AllocationSummary>::from_error(&err)),
        );
    }

    if request.capacity == Some(0) {
        let err = RulewardError::invalid_request("capacity must be > 0");
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<AllocationSummary>::from_error(&err)),
        );
    }

    let summary = state
        .engine
        .reallocate(request.policy, request.capacity)
        .await;
    (StatusCode::OK, Json(ApiResponse::success(summary)))
}
