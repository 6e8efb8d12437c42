//! ruleward - Multi-tenant firewall rule admission engine
//!
//! Entry point for the ruleward application.

use clap::Parser;
use ruleward::cli::{
    Cli, Commands, ConfigCommands, QuotaArgs, ReallocateArgs, ServeArgs, StatusArgs, SubmitArgs,
    TenantArgs,
};
use ruleward::config::{Config, LogFormat, LogOutput, LoggingConfig};
use ruleward::error::exit_code;
use ruleward::server::response::DecisionKind;
use ruleward::tenant::{AllocationSummary, TenantRegistry};
use ruleward::{AdmissionRequest, RulewardClient};
use std::future::Future;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    if let Err(e) = init_logging(&cli, &logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(exit_code::GENERAL_ERROR as u8);
    }

    match run(cli, config) {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Initialize the tracing subscriber from configuration and CLI flags.
///
/// `RUST_LOG` wins over both when set.
fn init_logging(
    cli: &Cli,
    logging: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = cli.log_level_override().unwrap_or(logging.level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match (logging.format, logging.output) {
        (LogFormat::Json, LogOutput::Stdout) => builder.json().try_init(),
        (LogFormat::Json, LogOutput::Stderr) => {
            builder.json().with_writer(std::io::stderr).try_init()
        }
        (LogFormat::Text, LogOutput::Stdout) => builder.try_init(),
        (LogFormat::Text, LogOutput::Stderr) => builder.with_writer(std::io::stderr).try_init(),
    }
}

/// Main application logic. Returns the process exit code.
fn run(cli: Cli, config: ruleward::Result<Config>) -> ruleward::Result<i32> {
    match &cli.command {
        Commands::Serve(args) => cmd_serve(config?, args),
        Commands::Submit(args) => cmd_submit(args),
        Commands::Tenant(args) => cmd_tenant(args),
        Commands::Status(args) => cmd_status(config, args),
        Commands::Quota(args) => cmd_quota(config, args),
        Commands::Reallocate(args) => cmd_reallocate(args),
        Commands::Config(subcmd) => cmd_config(config, subcmd),
    }
}

/// Runs a future to completion on a fresh multi-threaded runtime.
fn block_on<F: Future>(future: F) -> ruleward::Result<F::Output> {
    let runtime = tokio::runtime::Runtime::new()?;
    Ok(runtime.block_on(future))
}

/// Handle the `serve` command.
fn cmd_serve(mut config: Config, args: &ServeArgs) -> ruleward::Result<i32> {
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!(
        engine = %config.engine_name(),
        store = %config.store.backend,
        bind = %config.server.bind,
        port = %config.server.port,
        policy = %config.tenancy.policy,
        capacity = config.tenancy.capacity,
        "Starting ruleward server"
    );

    block_on(ruleward::serve(&config))??;
    Ok(exit_code::SUCCESS)
}

/// Handle the `submit` command.
fn cmd_submit(args: &SubmitArgs) -> ruleward::Result<i32> {
    let request = AdmissionRequest {
        tenant_id: args.tenant.clone(),
        secret: args.secret.clone(),
        operation: args.operation().code(),
        rule_id: args.rule_id.clone(),
        source_ip: args.source_ip.clone(),
        destination_ip: args.destination_ip.clone(),
        source_port: args.source_port.clone(),
        destination_port: args.destination_port.clone(),
        priority: args.priority,
        action: args.action.clone(),
    };

    let data = block_on(async {
        let client = RulewardClient::new(&args.target)?;
        client.submit(&request).await
    })??;

    println!("Request ID: {}", data.request_id);
    println!("Decision: {:?}", data.decision);
    println!("Message: {}", data.message);
    println!("Counter: {}", data.counter);
    if let Some(code) = data.code {
        println!("Code: {}", code);
    }

    Ok(match data.decision {
        DecisionKind::Accepted => exit_code::SUCCESS,
        DecisionKind::Rejected => exit_code::REJECTED,
    })
}

/// Handle the `tenant` command.
fn cmd_tenant(args: &TenantArgs) -> ruleward::Result<i32> {
    let tenant = block_on(async {
        let client = RulewardClient::new(&args.target)?;
        client.tenant(args.id).await
    })??;

    println!("Tenant: {}", tenant.id);
    match tenant.tier {
        Some(tier) => println!("Tier: {}", tier),
        None => println!("Tier: none"),
    }
    println!("Quota: {}", tenant.quota);
    println!("Live rules: {}", tenant.live_rules);
    Ok(exit_code::SUCCESS)
}

/// Handle the `status` command.
fn cmd_status(config: ruleward::Result<Config>, args: &StatusArgs) -> ruleward::Result<i32> {
    if let Some(target) = &args.target {
        tracing::info!(target = %target, "Checking remote engine status");

        let status = block_on(async {
            let client = RulewardClient::new(target)?;
            client.status().await
        })??;

        println!("Remote Engine Status");
        println!("====================");
        println!("Name: {}", status.engine.name);
        println!("Store: {}", status.engine.store);
        println!("Server: {}:{}", status.server.bind, status.server.port);
        println!("Tenant slots: {}", status.engine.slots);
        println!("Rules: {}", status.engine.rules);
        println!("Policy: {}", status.engine.policy);
        println!("Capacity: {}", status.engine.capacity);
        println!("Version: {}", status.version);
        println!("Uptime: {}s", status.uptime_seconds);
        println!("\nStatistics:");
        println!("  Total Requests: {}", status.stats.requests_total);
        println!("  Accepted: {}", status.stats.requests_accepted);
        println!("  Rejected: {}", status.stats.requests_rejected);
        return Ok(exit_code::SUCCESS);
    }

    let config = config?;
    println!("Engine Configuration");
    println!("====================");
    println!("Name: {}", config.engine_name());
    println!("Store: {}", config.store.backend);
    println!("Server: {}:{}", config.server.bind, config.server.port);
    println!(
        "Auth: {}",
        if config.auth.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("Tenant slots: {}", config.tenancy.slots);
    println!("Policy: {}", config.tenancy.policy);
    println!("Capacity: {}", config.tenancy.capacity);
    println!("Explicit secrets: {}", config.credentials.secrets.len());
    Ok(exit_code::SUCCESS)
}

/// Handle the `quota` command.
fn cmd_quota(config: ruleward::Result<Config>, args: &QuotaArgs) -> ruleward::Result<i32> {
    let summary = match &args.target {
        Some(target) => block_on(async {
            let client = RulewardClient::new(target)?;
            client.allocation().await
        })??,
        None => TenantRegistry::from_config(&config?.tenancy).summary(),
    };

    print_allocation(&summary);
    Ok(exit_code::SUCCESS)
}

/// Handle the `reallocate` command.
fn cmd_reallocate(args: &ReallocateArgs) -> ruleward::Result<i32> {
    let summary = block_on(async {
        let client = RulewardClient::new(&args.target)?;
        client
            .reallocate(args.policy, args.capacity, args.token.as_deref())
            .await
    })??;

    print_allocation(&summary);
    Ok(exit_code::SUCCESS)
}

fn print_allocation(summary: &AllocationSummary) {
    println!("Policy: {}", summary.policy);
    println!("Capacity: {}", summary.capacity);
    println!("Tenant slots: {}", summary.slots);
    println!();
    println!("{:<6} {:>8} {:>7} {:>8}", "TIER", "TENANTS", "SHARE", "QUOTA");
    for tier in &summary.tiers {
        println!(
            "{:<6} {:>8} {:>6}% {:>8}",
            tier.tier, tier.size, tier.share, tier.quota
        );
    }
}

/// Handle the `config` subcommand.
fn cmd_config(config: ruleward::Result<Config>, subcmd: &ConfigCommands) -> ruleward::Result<i32> {
    match subcmd {
        ConfigCommands::Validate => match config {
            Ok(config) => {
                println!("✓ Configuration is valid");
                tracing::debug!(?config, "Validated configuration");
                Ok(exit_code::SUCCESS)
            }
            Err(e) => {
                println!("✗ Configuration is invalid: {}", e);
                Err(e)
            }
        },
        ConfigCommands::Show => {
            let yaml = serde_yaml::to_string(&config?).map_err(|e| {
                ruleward::RulewardError::config_with_source("Failed to serialize configuration", e)
            })?;
            println!("{}", yaml);
            Ok(exit_code::SUCCESS)
        }
    }
}
