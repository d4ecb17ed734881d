// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ferry - account-to-account data transfer.
//!
//! This is the binary entry point for the transfer worker and job tooling.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod jobs;
mod worker;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ferry_config::FerryConfig;
use ferry_core::{DataVertical, FerryError};
use tracing_subscriber::EnvFilter;

/// Ferry - account-to-account data transfer.
#[derive(Parser, Debug)]
#[command(name = "ferry", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Claim and process transfer jobs until interrupted.
    Worker,
    /// Create a transfer job in the job store.
    CreateJob {
        /// Data vertical to transfer, e.g. PHOTOS.
        #[arg(long)]
        data_type: DataVertical,
        /// Service to export from.
        #[arg(long)]
        export: String,
        /// Service to import into.
        #[arg(long)]
        import: String,
    },
    /// Print a job's status as JSON.
    ShowJob { job_id: String },
    /// Delete a finished job and everything stored for it.
    DeleteJob { job_id: String },
    /// Print the effective configuration as TOML.
    Config,
}

fn init_tracing(config: &FerryConfig) {
    let fallback = format!("ferry={},warn", config.logging.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli, config: FerryConfig) -> Result<(), FerryError> {
    match cli.command {
        Some(Commands::Worker) => worker::run_worker(&config).await,
        Some(Commands::CreateJob {
            data_type,
            export,
            import,
        }) => jobs::create_job(&config, data_type, &export, &import).await,
        Some(Commands::ShowJob { job_id }) => jobs::show_job(&config, &job_id).await,
        Some(Commands::DeleteJob { job_id }) => jobs::delete_job(&config, &job_id).await,
        Some(Commands::Config) => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| FerryError::Internal(format!("failed to render config: {e}")))?;
            print!("{rendered}");
            Ok(())
        }
        None => {
            println!("ferry: use --help for available commands");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ferry_config::load_and_validate_path(path),
        None => ferry_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            ferry_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    if let Err(e) = run(cli, config).await {
        eprintln!("ferry: {e}");
        std::process::exit(1);
    }
}
