//! HTTP Client module for ruleward.
//!
//! This module provides the HTTP client functionality for talking to a
//! running ruleward engine.

pub mod api;

pub use api::RulewardClient;
