//! HTTP Server module - REST API server implementation.
//!
//! This module provides the HTTP server for ruleward, including
//! routing, request handling, and response formatting.

pub mod handlers;
pub mod response;
pub mod state;

#[cfg(test)]
mod handlers_tests;

use crate::config::Config;
use crate::error::{Result, RulewardError};
use axum::{
    routing::{get, post},
    Router,
};
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Creates the API router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and status endpoints
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/status", get(handlers::status))
        // Admission endpoint
        .route("/api/v1/rules", post(handlers::submit_rule))
        // Tenant and quota endpoints
        .route("/api/v1/tenants/:id", get(handlers::get_tenant))
        .route(
            "/api/v1/allocation",
            get(handlers::get_allocation).put(handlers::reallocate),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the HTTP server.
pub async fn serve(config: &Config) -> Result<()> {
    if !config.credentials.admits_any_tenant() {
        warn!(
            secrets = 0,
            id_as_secret = false,
            "No tenant can authenticate, all requests will be rejected"
        );
    }
    let state = Arc::new(AppState::new(config));
    info!(
        engine = %state.engine.name(),
        store = state.engine.store_name(),
        slots = state.engine.slots(),
        "Admission engine ready"
    );
    let router = create_router(state);

    let addr = SocketAddr::new(
        config
            .server
            .bind
            .parse()
            .map_err(|e| RulewardError::config(format!("Invalid bind address: {}", e)))?,
        config.server.port,
    );

    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        RulewardError::Connection {
            target: addr.to_string(),
            source: Some(Box::new(e)),
        }
    })?;

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_router() {
        let state = Arc::new(AppState::new(&Config::default()));
        let _router = create_router(state);
    }

    #[tokio::test]
    async fn test_serve_rejects_bad_bind_address() {
        let mut config = Config::default();
        config.server.bind = "not-an-address".to_string();

        let err = serve(&config).await.unwrap_err();
        assert!(err.to_string().contains("Invalid bind address"));
    }
}
