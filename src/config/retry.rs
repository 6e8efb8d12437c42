//! Retry and timeout configuration types.

use serde::{Deserialize, Serialize};

/// Retry policy for rule store calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per store call.
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_interval_ms: u64,

    /// Upper bound for the retry delay in milliseconds.
    pub max_interval_ms: u64,

    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval_ms: 50,
            max_interval_ms: 1000,
            multiplier: 2.0,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Rule store call timeout in milliseconds.
    pub store_ms: u64,

    /// HTTP client request timeout in seconds.
    pub http_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            store_ms: 2000,
            http_seconds: 30,
        }
    }
}
