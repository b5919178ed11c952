mod cli;
mod commands;
mod config;
mod data;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    info!("SITEOPT CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!(num_threads, "Configuring the Rayon global thread pool.");
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e))
            })?;
    }

    let result = match cli.command {
        Commands::Select(args) => {
            info!("Dispatching to 'select' command.");
            commands::select::run(args, cli.quiet)
        }
        Commands::Rank(args) => {
            info!("Dispatching to 'rank' command.");
            commands::rank::run(args, cli.quiet)
        }
    };

    if let Err(e) = &result {
        error!("Command failed: {}", e);
    }
    result
}
