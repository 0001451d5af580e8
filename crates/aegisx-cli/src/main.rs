//! Aegis-X CLI - Main entry point

mod commands;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aegisx_controller::{ControllerConfig, PolicyController};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "aegisx")]
#[command(about = "Aegis-X policy controller - compiles and applies firewall policy manifests", long_about = None)]
struct Cli {
    /// Directory holding policy manifests
    #[arg(long, global = true, default_value = "/etc/aegisx/policies")]
    policy_dir: PathBuf,

    /// Name of the managed kernel table
    #[arg(long, global = true, default_value = "aegisx")]
    table_name: String,

    /// Directory holding rollback snapshots
    #[arg(long, global = true, default_value = "/var/lib/aegisx/rollback")]
    rollback_dir: PathBuf,

    /// Translate and log, but never touch the kernel
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, validate, compile, translate, and apply the policy directory
    Apply,
    /// Show the difference between the live ruleset and the policy directory
    Diff,
    /// Restore the most recently captured rollback snapshot
    Rollback,
    /// Remove the managed table entirely
    Flush,
    /// Show the live ruleset and the last applied IR
    Status,
    /// Parse and validate a manifest file or directory without applying it
    Validate {
        path: PathBuf,
    },
    /// Run the cooperative reload loop until interrupted
    Watch {
        /// Seconds between reload attempts
        #[arg(long, default_value_t = 10)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aegisx=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let reload_interval = match &cli.command {
        Commands::Watch { interval_secs } => Duration::from_secs(*interval_secs),
        _ => ControllerConfig::default_reload_interval(),
    };

    let controller = Arc::new(PolicyController::new(ControllerConfig {
        table_name: cli.table_name,
        rollback_dir: cli.rollback_dir,
        dry_run: cli.dry_run,
        policy_dir: cli.policy_dir.clone(),
        reload_interval,
    }));

    match cli.command {
        Commands::Apply => commands::apply::handle_apply(&controller).await?,
        Commands::Diff => commands::apply::handle_diff(&controller, &cli.policy_dir).await?,
        Commands::Rollback => commands::rollback::handle_rollback(&controller).await?,
        Commands::Flush => commands::apply::handle_flush(&controller).await?,
        Commands::Status => commands::status::handle_status(&controller).await?,
        Commands::Validate { path } => commands::validate::handle_validate(&path).await?,
        Commands::Watch { .. } => commands::watch::handle_watch(controller).await?,
    }

    Ok(())
}
