//! Command-line interface definition for ruleward.
//!
//! This module defines the CLI structure using clap derive macros,
//! including all subcommands and their arguments.

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::LogLevel;
use crate::engine::Operation;
use crate::tenant::AllocationPolicy;

/// ruleward - Multi-tenant firewall rule admission engine
///
/// Validates, deduplicates and stores access-control rules submitted by
/// tenants that share one rule table under per-tenant quotas.
#[derive(Debug, Parser)]
#[command(name = "ruleward")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "RULEWARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level forced by `-v`/`-q`, if any.
    pub fn log_level_override(&self) -> Option<LogLevel> {
        if self.quiet {
            return Some(LogLevel::Error);
        }

        match self.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server and run the admission engine
    Serve(ServeArgs),

    /// Submit an add or delete request to a running engine
    Submit(SubmitArgs),

    /// Show one tenant's tier, quota and live rule count
    Tenant(TenantArgs),

    /// Show the status of a running engine, or the local configuration
    Status(StatusArgs),

    /// Print the quota allocation table
    Quota(QuotaArgs),

    /// Recompute tenant quotas on a running engine
    Reallocate(ReallocateArgs),

    /// Configuration file operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Arguments for the `serve` subcommand.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Bind address (overrides configuration)
    #[arg(long)]
    pub bind: Option<String>,

    /// Listen port (overrides configuration)
    #[arg(long)]
    pub port: Option<u16>,
}

/// Arguments for the `submit` subcommand.
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("operation").required(true).args(["add", "delete"])))]
pub struct SubmitArgs {
    /// Target engine URL (e.g. http://localhost:8080)
    #[arg(short, long)]
    pub target: String,

    /// Tenant id
    #[arg(long)]
    pub tenant: String,

    /// Tenant secret
    #[arg(long, env = "RULEWARD_TENANT_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Add the rule
    #[arg(long)]
    pub add: bool,

    /// Delete the rule
    #[arg(long)]
    pub delete: bool,

    /// Rule id, `<tenant>:<sequence>.`
    #[arg(long)]
    pub rule_id: String,

    /// Source address in CIDR form
    #[arg(long, default_value = "")]
    pub source_ip: String,

    /// Destination address in CIDR form
    #[arg(long, default_value = "")]
    pub destination_ip: String,

    /// Source port or `any`
    #[arg(long, default_value = "any")]
    pub source_port: String,

    /// Destination port or `any`
    #[arg(long, default_value = "any")]
    pub destination_port: String,

    /// Rule priority
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub priority: i32,

    /// `allow` or `deny`
    #[arg(long, default_value = "allow")]
    pub action: String,
}

impl SubmitArgs {
    pub fn operation(&self) -> Operation {
        if self.delete {
            Operation::Delete
        } else {
            Operation::Add
        }
    }
}

/// Arguments for the `tenant` subcommand.
#[derive(Debug, Args)]
pub struct TenantArgs {
    /// Target engine URL
    #[arg(short, long)]
    pub target: String,

    /// Tenant id
    pub id: u32,
}

/// Arguments for the `status` subcommand.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Remote engine URL (if checking remote status)
    #[arg(long)]
    pub target: Option<String>,
}

/// Arguments for the `quota` subcommand.
#[derive(Debug, Args)]
pub struct QuotaArgs {
    /// Read the live table from a running engine instead of the configuration
    #[arg(long)]
    pub target: Option<String>,
}

/// Arguments for the `reallocate` subcommand.
#[derive(Debug, Args)]
pub struct ReallocateArgs {
    /// Target engine URL
    #[arg(short, long)]
    pub target: String,

    /// Allocation policy
    #[arg(long, value_parser = parse_policy)]
    pub policy: AllocationPolicy,

    /// New total rule capacity
    #[arg(long)]
    pub capacity: Option<u32>,

    /// Administrative bearer token
    #[arg(long, env = "RULEWARD_ADMIN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Validate the configuration file
    Validate,

    /// Show the current configuration
    Show,
}

fn parse_policy(s: &str) -> Result<AllocationPolicy, String> {
    s.parse().map_err(|e: crate::error::RulewardError| e.to_string())
}
