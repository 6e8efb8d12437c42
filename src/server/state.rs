//! Application state management.
//!
//! This module manages the shared state across HTTP request handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{AuthConfig, Config};
use crate::engine::AdmissionEngine;
use crate::store::create_store;

/// Shared application state.
pub struct AppState {
    /// The admission engine.
    pub engine: Arc<AdmissionEngine>,
    /// Application start time.
    pub start_time: Instant,
    /// Server bind address.
    pub server_bind: String,
    /// Server port.
    pub server_port: u16,
    /// Administrative authentication.
    pub auth: AuthConfig,
    /// Statistics counters.
    pub stats: Stats,
}

impl AppState {
    /// Creates the application state and its engine from configuration.
    pub fn new(config: &Config) -> Self {
        let engine = AdmissionEngine::from_config(config, create_store(config));
        Self::with_engine(config, Arc::new(engine))
    }

    /// Creates the application state around an existing engine.
    pub fn with_engine(config: &Config, engine: Arc<AdmissionEngine>) -> Self {
        Self {
            engine,
            start_time: Instant::now(),
            server_bind: config.server.bind.clone(),
            server_port: config.server.port,
            auth: config.auth.clone(),
            stats: Stats::default(),
        }
    }

    /// Returns the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Records one admission request and its outcome.
    pub fn record(&self, accepted: bool) {
        self.stats.requests_total.fetch_add(1, Ordering::Relaxed);
        if accepted {
            self.stats.requests_accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.requests_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Statistics counters.
#[derive(Default)]
pub struct Stats {
    /// Admission requests received.
    pub requests_total: AtomicU64,
    /// Admissions accepted.
    pub requests_accepted: AtomicU64,
    /// Admissions rejected.
    pub requests_rejected: AtomicU64,
}

impl Stats {
    /// Gets the current statistics as a snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_accepted: self.requests_accepted.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of statistics counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub requests_total: u64,
    pub requests_accepted: u64,
    pub requests_rejected: u64,
}
