//! Timeout and retry wrapper around rule store calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::{RetryConfig, TimeoutConfig};
use crate::error::{Result, RulewardError};
use crate::rule::{Rule, RuleId};
use crate::store::RuleStore;

/// Bounds applied to every store call.
#[derive(Debug, Clone, PartialEq)]
pub struct StorePolicy {
    /// Per-attempt timeout.
    pub call_timeout: Duration,
    /// Total attempts, at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl StorePolicy {
    pub fn from_config(retry: &RetryConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            call_timeout: Duration::from_millis(timeouts.store_ms),
            max_attempts: retry.max_attempts.max(1),
            initial_backoff: Duration::from_millis(retry.initial_interval_ms),
            max_backoff: Duration::from_millis(retry.max_interval_ms),
            multiplier: retry.multiplier,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.saturating_sub(1) as i32);
        let millis = self.initial_backoff.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default(), &TimeoutConfig::default())
    }
}

/// A rule store whose calls are bounded by a [`StorePolicy`].
#[derive(Clone)]
pub struct StoreGuard {
    store: Arc<dyn RuleStore>,
    policy: StorePolicy,
}

impl StoreGuard {
    pub fn new(store: Arc<dyn RuleStore>, policy: StorePolicy) -> Self {
        Self { store, policy }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn policy(&self) -> &StorePolicy {
        &self.policy
    }

    pub async fn exists(&self, id: &RuleId) -> Result<bool> {
        self.call("store exists", || self.store.exists(id)).await
    }

    pub async fn put(&self, rule: &Rule) -> Result<()> {
        self.call("store put", || self.store.put(rule)).await
    }

    pub async fn delete(&self, id: &RuleId) -> Result<()> {
        self.call("store delete", || self.store.delete(id)).await
    }

    async fn call<T, F, Fut>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let err = match timeout(self.policy.call_timeout, f()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => RulewardError::Timeout {
                    operation: operation.to_string(),
                    millis: self.policy.call_timeout.as_millis() as u64,
                },
            };

            if attempt >= self.policy.max_attempts {
                warn!(
                    operation,
                    attempts = attempt,
                    error = %err,
                    "Store call failed, giving up"
                );
                return Err(err);
            }

            let delay = self.policy.backoff(attempt);
            debug!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Store call failed, retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::fixtures::rule;
    use crate::store::testing::{FaultOn, FaultyStore};
    use crate::store::MemoryStore;

    fn fast_policy(max_attempts: u32) -> StorePolicy {
        StorePolicy {
            call_timeout: Duration::from_millis(20),
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_policy_from_config() {
        let policy = StorePolicy::default();

        assert_eq!(policy.call_timeout, Duration::from_millis(2000));
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(50));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = StorePolicy {
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(300),
            ..StorePolicy::default()
        };

        assert_eq!(policy.backoff(1), Duration::from_millis(50));
        assert_eq!(policy.backoff(2), Duration::from_millis(100));
        assert_eq!(policy.backoff(3), Duration::from_millis(200));
        assert_eq!(policy.backoff(4), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_passes_through_success() {
        let guard = StoreGuard::new(Arc::new(MemoryStore::new()), fast_policy(3));
        let r = rule(1, 1);

        guard.put(&r).await.unwrap();
        assert!(guard.exists(&r.id).await.unwrap());
        assert_eq!(guard.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_retries_until_exhausted() {
        let store = Arc::new(FaultyStore::failing(FaultOn::Put));
        let guard = StoreGuard::new(store.clone(), fast_policy(3));

        let err = guard.put(&rule(1, 1)).await.unwrap_err();
        assert!(matches!(err, RulewardError::Store { .. }));
        assert_eq!(store.faulted_calls(), 3);
    }

    #[tokio::test]
    async fn test_times_out_hanging_call() {
        let store = Arc::new(FaultyStore::hanging(FaultOn::Exists));
        let guard = StoreGuard::new(store.clone(), fast_policy(2));

        let err = guard.exists(&rule(1, 1).id).await.unwrap_err();
        match err {
            RulewardError::Timeout { operation, millis } => {
                assert_eq!(operation, "store exists");
                assert_eq!(millis, 20);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.faulted_calls(), 2);
    }
}
