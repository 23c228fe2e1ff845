//! Crawl-Rotor main entry point
//!
//! This is the command-line interface for the Crawl-Rotor crawl orchestrator.

use clap::Parser;
use crawl_rotor::config::{load_config_with_hash, Config};
use crawl_rotor::server::{build_router, serve, ApiKey};
use crawl_rotor::strategy::Policy;
use crawl_rotor::ControlSurface;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Crawl-Rotor: an adaptive crawl orchestrator
///
/// Crawl-Rotor runs a single crawl loop through a rotating pool of proxy
/// identities, rotating on schedule, on repeated failures and on degraded
/// latency. The loop and its policy are driven through a REST control plane.
#[derive(Parser, Debug)]
#[command(name = "crawl-rotor")]
#[command(version = "1.0.0")]
#[command(about = "An adaptive crawl orchestrator", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the resolved settings without serving
    #[arg(long, conflicts_with = "autostart")]
    dry_run: bool,

    /// Start the crawl loop as soon as the control plane is up
    #[arg(long)]
    autostart: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_serve(config, cli.autostart).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_rotor=info,warn"),
            1 => EnvFilter::new("crawl_rotor=debug,info"),
            2 => EnvFilter::new("crawl_rotor=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the resolved configuration
fn handle_dry_run(config: &Config) {
    let policy = Policy::from_overrides(&config.policy);

    println!("=== Crawl-Rotor Dry Run ===\n");

    println!("Control plane:");
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    println!(
        "  API key: {}",
        if ApiKey::new(config.server.api_key.clone()).is_enabled() {
            "required"
        } else {
            "disabled"
        }
    );

    println!("\nLiveness probe:");
    println!("  Target: {}", config.probe.target_url);
    println!("  Timeout: {}s", config.probe.timeout_secs);

    println!("\nLoop:");
    println!("  Slot backoff: {}ms", config.orchestrator.slot_backoff_ms);
    println!(
        "  Recovery delay: {}s",
        config.orchestrator.recovery_delay_secs
    );
    println!("  Work timeout: {}s", config.orchestrator.work_timeout_secs);
    println!(
        "  Shutdown grace: {}s",
        config.orchestrator.shutdown_grace_secs
    );

    println!("\nPolicy (after clamping):");
    println!("  Concurrency limit: {}", policy.concurrency_limit);
    println!("  Cycle interval: {}s", policy.cycle_interval_secs);
    println!("  Rotation interval: {}s", policy.rotation_interval_secs);
    println!("  Retry count: {}", policy.retry_count);
    println!("  Fail threshold: {}", policy.fail_threshold);
    println!("  Delay threshold: {}s", policy.delay_threshold_secs);
    println!("  Target subject: {}", policy.target_subject);
    println!("  Max items per cycle: {}", policy.max_items_per_cycle);

    println!("\nWork:");
    println!("  URL template: {}", config.work.url_template);
    if config.work.items_pointer.is_empty() {
        println!("  Items: top-level array");
    } else {
        println!("  Items pointer: {}", config.work.items_pointer);
    }

    println!("\n✓ Configuration is valid");
}

/// Builds the components and serves the control plane until Ctrl-C
async fn handle_serve(config: Config, autostart: bool) -> anyhow::Result<()> {
    let control = Arc::new(ControlSurface::from_config(&config)?);
    let api_key = ApiKey::new(config.server.api_key.clone());
    if !api_key.is_enabled() {
        tracing::warn!("No API key configured, control plane is open");
    }
    let router = build_router(Arc::clone(&control), api_key);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if autostart {
        control.start_loop();
    }

    serve(listener, router, shutdown_signal()).await?;

    if control.stop_loop().await.stopped {
        tracing::info!("Crawl loop stopped");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
