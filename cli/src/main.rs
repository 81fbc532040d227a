//! DMS Process Manager CLI - Run and reap external programs
//!
//! A command-line front end for the process manager: run a program with a
//! maximum run time, terminate a stray process by PID, or inspect the
//! terminator configuration.

mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dms_procman_core::ConfigStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dms-procman")]
#[command(author, version, about = "Run and reap external programs under the DMS process manager")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log what the process terminator is doing
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a program and terminate it once its time runs out
    Run {
        /// Name used for the program in log messages
        #[arg(short, long)]
        name: Option<String>,

        /// Maximum run time in milliseconds
        #[arg(short, long, default_value_t = 3_600_000)]
        timeout_ms: u64,

        /// Time given to each termination technique in milliseconds
        #[arg(long, default_value_t = 2_000)]
        terminate_timeout_ms: u64,

        /// The program to run and its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Terminate a running process by PID
    Reap {
        /// Process ID
        pid: u32,

        /// Name used for the process in log messages
        #[arg(short, long)]
        name: Option<String>,

        /// Time given to each termination technique in milliseconds
        #[arg(long, default_value_t = 2_000)]
        terminate_timeout_ms: u64,
    },

    /// Show current configuration
    Config {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "dms_procman=debug,dms_procman_core=debug"
    } else {
        "dms_procman=info,dms_procman_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
    tracing::debug!(?cli, "parsed CLI arguments");

    let store = match cli.config {
        Some(path) => ConfigStore::with_path(path),
        None => ConfigStore::new()?,
    };

    match cli.command {
        Commands::Run {
            name,
            timeout_ms,
            terminate_timeout_ms,
            command,
        } => {
            let config = store.load().await?;
            commands::run::run(
                config,
                name,
                Duration::from_millis(timeout_ms),
                Duration::from_millis(terminate_timeout_ms),
                command,
            )
            .await?;
        }
        Commands::Reap {
            pid,
            name,
            terminate_timeout_ms,
        } => {
            let config = store.load().await?;
            commands::reap::run(config, pid, name, Duration::from_millis(terminate_timeout_ms))
                .await?;
        }
        Commands::Config { json } => {
            commands::config::show(&store, json).await?;
        }
    }

    Ok(())
}
