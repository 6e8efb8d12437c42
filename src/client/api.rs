//! Ruleward HTTP client API.
//!
//! This module provides the client for submitting rules to a running engine
//! and querying its tenants and allocation table.

use crate::engine::AdmissionRequest;
use crate::error::{ErrorCode, Result, RulewardError};
use crate::server::response::{
    AdmissionData, AllocationRequest, ApiResponse, HealthData, StatusData, TenantData,
};
use crate::tenant::{AllocationPolicy, AllocationSummary};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for HTTP requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Ruleward HTTP client for communicating with an engine.
#[derive(Debug, Clone)]
pub struct RulewardClient {
    /// HTTP client.
    client: Client,
    /// Base URL of the target engine.
    base_url: String,
}

impl RulewardClient {
    /// Creates a new client for the specified engine URL.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the engine (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new client with custom timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RulewardError::connection_with_source(&base_url, e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Checks the health of the target engine.
    pub async fn health(&self) -> Result<HealthData> {
        let url = format!("{}/api/v1/health", self.base_url);
        debug!(url = %url, "Checking engine health");

        let response: ApiResponse<HealthData> = self.send(self.client.get(&url), "health").await?;
        Self::into_data(response, "health")
    }

    /// Gets the status of the target engine.
    pub async fn status(&self) -> Result<StatusData> {
        let url = format!("{}/api/v1/status", self.base_url);
        debug!(url = %url, "Getting engine status");

        let response: ApiResponse<StatusData> = self.send(self.client.get(&url), "status").await?;
        Self::into_data(response, "status")
    }

    /// Submits an add or delete request.
    ///
    /// A rejection is still a decision: it comes back as `Ok` with
    /// `decision` set to rejected. Only transport failures and responses
    /// without admission data are errors.
    pub async fn submit(&self, request: &AdmissionRequest) -> Result<AdmissionData> {
        let url = format!("{}/api/v1/rules", self.base_url);

        info!(
            url = %url,
            tenant = %request.tenant_id,
            rule_id = %request.rule_id,
            operation = request.operation,
            "Submitting rule"
        );

        let response: ApiResponse<AdmissionData> = self
            .send(self.client.post(&url).json(request), "admission")
            .await?;

        match response.data {
            Some(data) => Ok(data),
            None => Err(Self::extract_error(&response)),
        }
    }

    /// Gets one tenant's tier, quota and live rule count.
    pub async fn tenant(&self, id: u32) -> Result<TenantData> {
        let url = format!("{}/api/v1/tenants/{}", self.base_url, id);
        debug!(url = %url, tenant = id, "Getting tenant");

        let response: ApiResponse<TenantData> = self.send(self.client.get(&url), "tenant").await?;
        Self::into_data(response, "tenant")
    }

    /// Gets the current allocation table.
    pub async fn allocation(&self) -> Result<AllocationSummary> {
        let url = format!("{}/api/v1/allocation", self.base_url);
        debug!(url = %url, "Getting allocation table");

        let response: ApiResponse<AllocationSummary> =
            self.send(self.client.get(&url), "allocation").await?;
        Self::into_data(response, "allocation")
    }

    /// Recomputes every tenant quota on the target engine.
    ///
    /// # Arguments
    /// * `policy` - New allocation policy
    /// * `capacity` - New total capacity, or `None` to keep the current one
    /// * `token` - Administrative bearer token, when the engine requires one
    pub async fn reallocate(
        &self,
        policy: AllocationPolicy,
        capacity: Option<u32>,
        token: Option<&str>,
    ) -> Result<AllocationSummary> {
        let url = format!("{}/api/v1/allocation", self.base_url);
        info!(url = %url, policy = %policy, ?capacity, "Reallocating quotas");

        let mut builder = self
            .client
            .put(&url)
            .json(&AllocationRequest { policy, capacity });
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response: ApiResponse<AllocationSummary> = self.send(builder, "allocation").await?;
        Self::into_data(response, "allocation")
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<ApiResponse<T>> {
        let response = builder
            .send()
            .await
            .map_err(|e| RulewardError::connection_with_source(&self.base_url, e))?;

        response.json().await.map_err(|e| {
            RulewardError::connection_with_source(
                format!("{} (unreadable {} response)", self.base_url, what),
                e,
            )
        })
    }

    fn into_data<T>(response: ApiResponse<T>, what: &str) -> Result<T> {
        if !response.success {
            return Err(Self::extract_error(&response));
        }
        response
            .data
            .ok_or_else(|| RulewardError::invalid_request(format!("{} response missing data", what)))
    }

    /// Extracts an error from an API response.
    fn extract_error<T>(response: &ApiResponse<T>) -> RulewardError {
        match &response.error {
            Some(err) => RulewardError::Remote {
                code: err.code,
                message: err.message.clone(),
            },
            None => RulewardError::Remote {
                code: ErrorCode::InvalidRequest,
                message: "Unknown error".to_string(),
            },
        }
    }
}
