//! Tests for the admission engine.

#[cfg(test)]
mod tests {
    use crate::engine::{
        Acceptance, AdmissionEngine, AdmissionRequest, AdmissionResponse, Decision, StoreGuard,
        StorePolicy,
    };
    use crate::error::{AdmissionError, ErrorCode};
    use crate::rule::RuleId;
    use crate::store::testing::{FaultOn, FaultyStore};
    use crate::store::{MemoryStore, RuleStore};
    use crate::tenant::{
        default_tiers, AllocationPolicy, CredentialTable, TenantId, TenantRegistry,
        TierPrecedence,
    };
    use crate::validate::Field;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn fast_policy() -> StorePolicy {
        StorePolicy {
            call_timeout: Duration::from_millis(50),
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            multiplier: 2.0,
        }
    }

    fn engine_with(store: Arc<dyn RuleStore>) -> AdmissionEngine {
        engine_with_policy(store, fast_policy())
    }

    fn engine_with_policy(store: Arc<dyn RuleStore>, policy: StorePolicy) -> AdmissionEngine {
        let tenants = TenantRegistry::new(
            400,
            4000,
            AllocationPolicy::Tiered,
            default_tiers(),
            TierPrecedence::LowestIndexFirst,
        );
        let credentials = CredentialTable::new(HashMap::new(), true);
        AdmissionEngine::new(
            "test-engine",
            tenants,
            credentials,
            StoreGuard::new(store, policy),
        )
    }

    fn memory_engine() -> (AdmissionEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (engine_with(store.clone()), store)
    }

    fn request(tenant: u32, sequence: u32, operation: i64) -> AdmissionRequest {
        AdmissionRequest {
            tenant_id: tenant.to_string(),
            secret: tenant.to_string(),
            operation,
            rule_id: format!("{}:{}.", tenant, sequence),
            source_ip: "10.0.0.1/24".to_string(),
            destination_ip: "192.168.1.10/32".to_string(),
            source_port: "40000".to_string(),
            destination_port: "8080".to_string(),
            priority: 10,
            action: "ALLOW".to_string(),
        }
    }

    fn add(tenant: u32, sequence: u32) -> AdmissionRequest {
        request(tenant, sequence, 0)
    }

    fn delete(tenant: u32, sequence: u32) -> AdmissionRequest {
        request(tenant, sequence, 1)
    }

    fn id(tenant: u32, sequence: u32) -> RuleId {
        RuleId::new(TenantId::new(tenant), sequence)
    }

    fn rejection(response: &AdmissionResponse) -> &AdmissionError {
        response
            .rejection()
            .unwrap_or_else(|| panic!("expected a rejection, got {:?}", response.decision))
    }

    async fn live(engine: &AdmissionEngine, tenant: u32) -> u32 {
        engine.tenant(TenantId::new(tenant)).await.unwrap().live_rules
    }

    #[tokio::test]
    async fn test_add_stores_rule_and_counts() {
        let (engine, store) = memory_engine();

        let response = engine.submit(&add(7, 1)).await;

        assert_eq!(
            response.decision,
            Decision::Accepted(Acceptance::Stored { rule_id: id(7, 1) })
        );
        assert_eq!(response.counter, 1);
        assert_eq!(response.message(), "Rule 7:1. for tenant 7 stored.");
        assert!(store.exists(&id(7, 1)).await.unwrap());
        assert_eq!(engine.rule_count().await, 1);
    }

    #[tokio::test]
    async fn test_second_identical_add_already_exists() {
        let (engine, _store) = memory_engine();

        assert!(engine.submit(&add(7, 1)).await.decision.is_accepted());
        let response = engine.submit(&add(7, 1)).await;

        assert_eq!(rejection(&response).code(), ErrorCode::AlreadyExists);
        assert_eq!(response.message(), "Rule 7:1. for tenant 7 already exists.");
        assert_eq!(response.counter, 1);
    }

    #[tokio::test]
    async fn test_add_then_delete_round_trip() {
        let (engine, store) = memory_engine();

        engine.submit(&add(7, 1)).await;
        let response = engine.submit(&delete(7, 1)).await;

        assert_eq!(
            response.decision,
            Decision::Accepted(Acceptance::Deleted { rule_id: id(7, 1) })
        );
        assert_eq!(response.counter, 0);
        assert!(!store.exists(&id(7, 1)).await.unwrap());
        assert_eq!(engine.rule_count().await, 0);
    }

    #[tokio::test]
    async fn test_deleted_rule_can_be_added_by_another_tenant() {
        let (engine, _store) = memory_engine();

        engine.submit(&add(7, 1)).await;
        engine.submit(&delete(7, 1)).await;
        let response = engine.submit(&add(6, 1)).await;

        assert!(response.decision.is_accepted());
        assert_eq!(response.counter, 1);
    }

    #[tokio::test]
    async fn test_delete_absent_rule() {
        let (engine, _store) = memory_engine();

        let response = engine.submit(&delete(7, 3)).await;

        assert_eq!(rejection(&response).code(), ErrorCode::RuleNotFound);
        assert_eq!(response.message(), "Rule 7:3. for tenant 7 does not exist.");
        assert_eq!(response.counter, 0);
    }

    #[tokio::test]
    async fn test_higher_tier_migrates_rule() {
        let (engine, store) = memory_engine();

        engine.submit(&add(250, 1)).await;
        let response = engine.submit(&add(5, 1)).await;

        assert_eq!(
            response.decision,
            Decision::Accepted(Acceptance::Migrated {
                rule_id: id(5, 1),
                previous_owner: TenantId::new(250),
                previous_rule_id: id(250, 1),
            })
        );
        assert_eq!(response.counter, 1);
        assert_eq!(live(&engine, 250).await, 0);
        assert!(store.exists(&id(5, 1)).await.unwrap());
        assert!(!store.exists(&id(250, 1)).await.unwrap());
        assert_eq!(engine.rule_count().await, 1);
    }

    #[tokio::test]
    async fn test_lower_tier_is_rejected() {
        let (engine, _store) = memory_engine();

        engine.submit(&add(5, 1)).await;
        let response = engine.submit(&add(250, 1)).await;

        assert_eq!(
            rejection(&response),
            &AdmissionError::DuplicateOwnedByOther {
                owner: TenantId::new(5),
                existing: "5:1.".to_string(),
            }
        );
        assert_eq!(response.message(), "The rule exists for tenant 5 as 5:1.");
        assert_eq!(response.counter, 0);
        assert_eq!(live(&engine, 5).await, 1);
    }

    #[tokio::test]
    async fn test_same_tier_higher_id_wins() {
        let (engine, _store) = memory_engine();

        engine.submit(&add(10, 1)).await;
        let response = engine.submit(&add(20, 1)).await;
        assert!(matches!(
            response.decision,
            Decision::Accepted(Acceptance::Migrated { .. })
        ));

        let response = engine.submit(&add(10, 2)).await;
        match rejection(&response) {
            AdmissionError::DuplicateOwnedByOther { owner, .. } => {
                assert_eq!(*owner, TenantId::new(20))
            }
            other => panic!("unexpected rejection: {:?}", other),
        }
        assert_eq!(live(&engine, 10).await, 0);
        assert_eq!(live(&engine, 20).await, 1);
    }

    #[tokio::test]
    async fn test_previous_owner_cannot_delete_migrated_rule() {
        let (engine, _store) = memory_engine();

        engine.submit(&add(250, 1)).await;
        engine.submit(&add(5, 1)).await;
        let response = engine.submit(&delete(250, 1)).await;

        assert_eq!(rejection(&response).code(), ErrorCode::RuleNotFound);
        assert_eq!(response.counter, 0);
    }

    #[tokio::test]
    async fn test_duplicate_of_own_rule() {
        let (engine, _store) = memory_engine();

        engine.submit(&add(7, 1)).await;
        let response = engine.submit(&add(7, 2)).await;

        assert_eq!(
            rejection(&response),
            &AdmissionError::DuplicateOfOwnRule {
                owner: TenantId::new(7),
                existing: "7:1.".to_string(),
            }
        );
        assert_eq!(response.counter, 1);
    }

    #[tokio::test]
    async fn test_stored_wildcard_conflicts_with_concrete_port() {
        let (engine, _store) = memory_engine();

        let mut first = add(5, 1);
        first.destination_port = "ANY".to_string();
        engine.submit(&first).await;

        let response = engine.submit(&add(250, 1)).await;
        assert_eq!(rejection(&response).code(), ErrorCode::DuplicateRule);
    }

    #[tokio::test]
    async fn test_candidate_wildcard_conflicts_with_concrete_port() {
        let (engine, _store) = memory_engine();

        engine.submit(&add(5, 1)).await;

        let mut second = add(250, 1);
        second.destination_port = "none".to_string();
        second.source_port = "Any".to_string();
        let response = engine.submit(&second).await;
        assert_eq!(rejection(&response).code(), ErrorCode::DuplicateRule);
    }

    #[tokio::test]
    async fn test_action_casing_does_not_defeat_duplicates() {
        let (engine, _store) = memory_engine();

        engine.submit(&add(5, 1)).await;

        let mut second = add(250, 1);
        second.action = "allow".to_string();
        let response = engine.submit(&second).await;
        assert_eq!(rejection(&response).code(), ErrorCode::DuplicateRule);
    }

    #[tokio::test]
    async fn test_invalid_tenant_reports_zero_counter() {
        let (engine, _store) = memory_engine();
        engine.submit(&add(7, 1)).await;

        let mut req = add(7, 2);
        req.tenant_id = "400".to_string();
        let response = engine.submit(&req).await;

        assert_eq!(rejection(&response).code(), ErrorCode::InvalidTenantId);
        assert_eq!(response.counter, 0);
    }

    #[tokio::test]
    async fn test_bad_secret_reports_zero_counter() {
        let (engine, _store) = memory_engine();
        engine.submit(&add(7, 1)).await;

        let mut req = add(7, 2);
        req.secret = "guess".to_string();
        let response = engine.submit(&req).await;

        assert_eq!(rejection(&response).code(), ErrorCode::InvalidCredential);
        assert_eq!(response.counter, 0);
    }

    #[tokio::test]
    async fn test_field_rejection_reports_live_counter() {
        let (engine, _store) = memory_engine();
        engine.submit(&add(7, 1)).await;

        let mut req = add(7, 2);
        req.source_ip = "10.0.0.1/4".to_string();
        let response = engine.submit(&req).await;

        match rejection(&response) {
            AdmissionError::Invalid(err) => assert_eq!(err.field(), Field::SourceIp),
            other => panic!("unexpected rejection: {:?}", other),
        }
        assert_eq!(response.counter, 1);
    }

    #[tokio::test]
    async fn test_rule_number_beyond_quota() {
        let (engine, _store) = memory_engine();

        // Tier 0 tenants get 10 rules by default.
        let response = engine.submit(&add(7, 11)).await;

        assert_eq!(rejection(&response).code(), ErrorCode::InvalidRuleId);
        assert!(response.message().contains("between 1 and 10"));
    }

    #[tokio::test]
    async fn test_quota_exceeded_after_shrink() {
        let (engine, _store) = memory_engine();

        let mut second = add(7, 2);
        second.priority = 2;
        let mut third = add(7, 3);
        third.priority = 3;
        engine.submit(&second).await;
        engine.submit(&third).await;

        let summary = engine.reallocate(AllocationPolicy::Uniform, Some(400)).await;
        assert_eq!(summary.policy, AllocationPolicy::Uniform);

        let response = engine.submit(&add(7, 1)).await;
        assert_eq!(
            rejection(&response),
            &AdmissionError::QuotaExceeded {
                tenant: TenantId::new(7),
                limit: 1,
            }
        );
        assert_eq!(response.counter, 2);
    }

    #[tokio::test]
    async fn test_delete_beyond_shrunken_quota() {
        let (engine, store) = memory_engine();

        assert!(engine.submit(&add(7, 5)).await.decision.is_accepted());
        engine.reallocate(AllocationPolicy::Uniform, Some(400)).await;
        assert_eq!(engine.tenant(TenantId::new(7)).await.unwrap().quota, 1);

        let response = engine.submit(&delete(7, 6)).await;
        assert_eq!(rejection(&response).code(), ErrorCode::InvalidRuleId);

        let response = engine.submit(&delete(7, 5)).await;
        assert_eq!(
            response.decision,
            Decision::Accepted(Acceptance::Deleted { rule_id: id(7, 5) })
        );
        assert_eq!(response.counter, 0);
        assert_eq!(live(&engine, 7).await, 0);
        assert!(!store.exists(&id(7, 5)).await.unwrap());

        // With the rule gone the shrunken range applies again.
        let response = engine.submit(&delete(7, 5)).await;
        assert_eq!(rejection(&response).code(), ErrorCode::InvalidRuleId);
        assert!(response.message().contains("between 1 and 1"));
    }

    #[tokio::test]
    async fn test_reallocate_keeps_capacity_when_omitted() {
        let (engine, _store) = memory_engine();

        let summary = engine.reallocate(AllocationPolicy::Uniform, None).await;

        assert_eq!(summary.capacity, 4000);
        assert!(summary.tiers.iter().all(|tier| tier.quota == 10));
        assert_eq!(engine.summary().await.policy, AllocationPolicy::Uniform);
    }

    #[tokio::test]
    async fn test_store_put_failure_leaves_state_untouched() {
        let store = Arc::new(FaultyStore::failing(FaultOn::Put));
        let engine = engine_with(store.clone());

        let response = engine.submit(&add(7, 1)).await;

        let err = rejection(&response);
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);
        assert!(err.is_retryable());
        assert_eq!(response.counter, 0);
        assert_eq!(engine.rule_count().await, 0);
        assert_eq!(store.faulted_calls(), 2);

        store.arm(false);
        let response = engine.submit(&add(7, 1)).await;
        assert!(response.decision.is_accepted());
        assert_eq!(response.counter, 1);
    }

    #[tokio::test]
    async fn test_store_timeout_is_store_unavailable() {
        let store = Arc::new(FaultyStore::hanging(FaultOn::Exists));
        let engine = engine_with(store);

        let response = engine.submit(&add(7, 1)).await;

        assert_eq!(rejection(&response).code(), ErrorCode::StoreUnavailable);
        assert!(response.message().contains("Try again later"));
        assert_eq!(response.counter, 0);
    }

    #[tokio::test]
    async fn test_lookups_do_not_wait_for_store() {
        let store = Arc::new(FaultyStore::hanging(FaultOn::Exists));
        let policy = StorePolicy {
            call_timeout: Duration::from_secs(2),
            max_attempts: 1,
            ..fast_policy()
        };
        let engine = Arc::new(engine_with_policy(store.clone(), policy));

        let pending = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.submit(&add(7, 1)).await })
        };
        while store.faulted_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let quick = Duration::from_millis(200);
        let tenant = tokio::time::timeout(quick, engine.tenant(TenantId::new(100)))
            .await
            .expect("tenant lookup waited on the store");
        assert_eq!(tenant.unwrap().live_rules, 0);
        let count = tokio::time::timeout(quick, engine.rule_count())
            .await
            .expect("rule count waited on the store");
        assert_eq!(count, 0);
        tokio::time::timeout(quick, engine.summary())
            .await
            .expect("summary waited on the store");
        assert!(!pending.is_finished());

        let response = pending.await.unwrap();
        assert_eq!(rejection(&response).code(), ErrorCode::StoreUnavailable);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_counter() {
        let store = Arc::new(FaultyStore::failing_for(FaultOn::Delete, id(7, 1)));
        let engine = engine_with(store.clone());

        engine.submit(&add(7, 1)).await;
        let response = engine.submit(&delete(7, 1)).await;

        assert_eq!(rejection(&response).code(), ErrorCode::StoreUnavailable);
        assert_eq!(response.counter, 1);
        assert_eq!(engine.rule_count().await, 1);
        assert!(store.inner().exists(&id(7, 1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_migration_rolls_back() {
        let store = Arc::new(FaultyStore::failing_for(FaultOn::Delete, id(250, 1)));
        let engine = engine_with(store.clone());

        engine.submit(&add(250, 1)).await;
        let response = engine.submit(&add(5, 1)).await;

        assert_eq!(rejection(&response).code(), ErrorCode::StoreUnavailable);
        assert_eq!(response.counter, 0);
        assert_eq!(live(&engine, 250).await, 1);
        assert!(store.inner().exists(&id(250, 1)).await.unwrap());
        assert!(!store.inner().exists(&id(5, 1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_identical_adds_admit_one_rule() {
        let (engine, store) = memory_engine();
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..20)
            .map(|tenant| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.submit(&add(tenant, 1)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(engine.rule_count().await, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.exists(&id(19, 1)).await.unwrap());

        let mut total = 0;
        for tenant in 0..20 {
            total += live(&engine, tenant).await;
        }
        assert_eq!(total, 1);
    }
}
