//! ruleward - Multi-tenant firewall rule admission engine
//!
//! This crate validates, deduplicates and stores access-control rules
//! submitted by many tenants that share one finite rule table.
//!
//! # Overview
//!
//! Each tenant authenticates with a secret and owns a quota of rule slots
//! derived from its precedence tier. A submitted rule is checked field by
//! field, compared against every live rule for a semantic duplicate, and
//! either stored, rejected, or migrated away from a lower-precedence owner.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`client`] - HTTP client for a running engine
//! - [`config`] - Configuration file parsing and validation
//! - [`engine`] - The admission pipeline
//! - [`error`] - Error types and error handling
//! - [`rule`] - Rule model and the live rule inventory
//! - [`server`] - HTTP API server
//! - [`store`] - Rule store backends
//! - [`tenant`] - Tenant registry and quota allocation
//! - [`validate`] - Request field validators

pub mod cli;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod rule;
pub mod server;
pub mod store;
pub mod tenant;
pub mod validate;

// Re-exports for convenience
pub use cli::Cli;
pub use client::RulewardClient;
pub use config::Config;
pub use engine::{AdmissionEngine, AdmissionRequest, AdmissionResponse, Decision};
pub use error::{AdmissionError, ErrorCode, Result, RulewardError};
pub use server::serve;
