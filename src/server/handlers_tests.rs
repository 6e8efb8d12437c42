//! Tests for HTTP request handlers.

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::server::create_router;
    use crate::server::state::AppState;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_config() -> Config {
        let mut config = Config::default();
        config.name = Some("test-engine".to_string());
        config.credentials.id_as_secret = true;
        config.credentials.secrets.insert(5, "five".to_string());
        config
    }

    fn create_test_state(config: &Config) -> Arc<AppState> {
        Arc::new(AppState::new(config))
    }

    fn create_test_router(state: Arc<AppState>) -> Router {
        create_router(state)
    }

    fn rule_body(tenant: u32, secret: &str, sequence: u32, operation: i64) -> Value {
        json!({
            "tenant_id": tenant.to_string(),
            "secret": secret,
            "operation": operation,
            "rule_id": format!("{}:{}.", tenant, sequence),
            "source_ip": "10.1.0.0/16",
            "destination_ip": "172.16.0.1/32",
            "source_port": "any",
            "destination_port": "8443",
            "priority": 100,
            "action": "deny",
        })
    }

    fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        send(app, request).await
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_router(create_test_state(&create_test_config()));

        let (status, body) = get(&app, "/api/v1/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let app = create_test_router(create_test_state(&create_test_config()));

        let (status, body) = get(&app, "/api/v1/status").await;

        assert_eq!(status, StatusCode::OK);
        let engine = &body["data"]["engine"];
        assert_eq!(engine["name"], "test-engine");
        assert_eq!(engine["store"], "memory");
        assert_eq!(engine["slots"], 400);
        assert_eq!(engine["rules"], 0);
        assert_eq!(engine["policy"], "tiered");
        assert_eq!(engine["capacity"], 4000);
    }

    #[tokio::test]
    async fn test_submit_rule_accepted() {
        let state = create_test_state(&create_test_config());
        let app = create_test_router(state.clone());

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/v1/rules", &rule_body(7, "7", 1, 0)),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["decision"], "accepted");
        assert_eq!(body["data"]["counter"], "1");
        assert_eq!(body["data"]["message"], "Rule 7:1. for tenant 7 stored.");
        assert!(body["data"].get("code").is_none());
        assert_eq!(state.stats.requests_accepted.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_submit_rule_explicit_secret() {
        let app = create_test_router(create_test_state(&create_test_config()));

        let (status, _) = send(
            &app,
            json_request(Method::POST, "/api/v1/rules", &rule_body(5, "five", 1, 0)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/v1/rules", &rule_body(5, "5", 2, 0)),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "E003");
        assert_eq!(body["data"]["counter"], "0");
    }

    #[tokio::test]
    async fn test_submit_rule_duplicate_is_conflict() {
        let state = create_test_state(&create_test_config());
        let app = create_test_router(state.clone());

        send(
            &app,
            json_request(Method::POST, "/api/v1/rules", &rule_body(7, "7", 1, 0)),
        )
        .await;
        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/v1/rules", &rule_body(7, "7", 1, 0)),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["decision"], "rejected");
        assert_eq!(body["data"]["code"], "E009");
        assert_eq!(body["data"]["counter"], "1");
        assert_eq!(body["error"]["code"], "E009");

        let stats = state.stats.snapshot();
        assert_eq!(stats.requests_total, 2);
        assert_eq!(stats.requests_rejected, 1);
    }

    #[tokio::test]
    async fn test_submit_rule_invalid_port() {
        let app = create_test_router(create_test_state(&create_test_config()));
        let mut body = rule_body(7, "7", 1, 0);
        body["destination_port"] = json!("80");

        let (status, body) = send(&app, json_request(Method::POST, "/api/v1/rules", &body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "E007");
        assert_eq!(body["error"]["details"]["field"], "destination_port");
    }

    #[tokio::test]
    async fn test_delete_missing_rule_not_found() {
        let app = create_test_router(create_test_state(&create_test_config()));

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/v1/rules", &rule_body(7, "7", 3, 1)),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "E012");
    }

    #[tokio::test]
    async fn test_submit_rule_malformed_body() {
        let app = create_test_router(create_test_state(&create_test_config()));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/rules")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"tenant_id\": 7}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_get_tenant_endpoint() {
        let app = create_test_router(create_test_state(&create_test_config()));
        send(
            &app,
            json_request(Method::POST, "/api/v1/rules", &rule_body(250, "250", 1, 0)),
        )
        .await;

        let (status, body) = get(&app, "/api/v1/tenants/250").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], 250);
        assert_eq!(body["data"]["tier"], 1);
        assert_eq!(body["data"]["quota"], 12);
        assert_eq!(body["data"]["live_rules"], 1);
    }

    #[tokio::test]
    async fn test_get_tenant_not_found() {
        let app = create_test_router(create_test_state(&create_test_config()));

        for uri in ["/api/v1/tenants/400", "/api/v1/tenants/abc"] {
            let (status, body) = get(&app, uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"]["code"], "E002");
        }
    }

    #[tokio::test]
    async fn test_reallocate_without_auth() {
        let app = create_test_router(create_test_state(&create_test_config()));

        let (status, body) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/v1/allocation",
                &json!({"policy": "uniform", "capacity": 800}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["policy"], "uniform");
        assert_eq!(body["data"]["capacity"], 800);

        let (_, body) = get(&app, "/api/v1/tenants/0").await;
        assert_eq!(body["data"]["quota"], 2);

        let (_, body) = get(&app, "/api/v1/allocation").await;
        assert_eq!(body["data"]["policy"], "uniform");
    }

    #[tokio::test]
    async fn test_reallocate_requires_token_when_enabled() {
        let mut config = create_test_config();
        config.auth.enabled = true;
        config.auth.token = Some("s3cret".to_string());
        let app = create_test_router(create_test_state(&config));
        let body = json!({"policy": "uniform"});

        let (status, response) = send(
            &app,
            json_request(Method::PUT, "/api/v1/allocation", &body),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(response["error"]["code"], "E016");

        let mut request = json_request(Method::PUT, "/api/v1/allocation", &body);
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
        let (status, response) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["data"]["capacity"], 4000);
    }

    #[tokio::test]
    async fn test_reallocate_zero_capacity() {
        let app = create_test_router(create_test_state(&create_test_config()));

        let (status, body) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/v1/allocation",
                &json!({"policy": "tiered", "capacity": 0}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "E015");
    }
}
