//! ddrgate CLI: the main entry point.
//!
//! Commands:
//! - `harness` Run a scenario against frozen fixtures and golden files
//! - `hash`    Print the contract hash of a JSON file
//! - `verify`  Check a contract file against a claimed hash
//! - `init`    Write the default configuration
//! - `serve`   Start the HTTP API server

use clap::{Parser, Subcommand};
use ddrgate::harness::Scenario;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "ddrgate",
    about = "ddrgate: Decision contract governance engine",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a harness scenario twice and check it against golden files
    Harness {
        /// Scenario to run
        #[arg(value_enum)]
        scenario: Scenario,

        /// Golden file directory (defaults to [harness].golden_dir)
        #[arg(short, long)]
        golden_dir: Option<PathBuf>,

        /// Rewrite golden files instead of comparing against them
        #[arg(short, long)]
        update: bool,
    },

    /// Canonicalize a JSON file and print its hash
    Hash {
        /// JSON file to hash
        file: PathBuf,
    },

    /// Verify a contract file against a claimed hash
    Verify {
        /// Contract file
        file: PathBuf,

        /// Claimed hash, e.g. sha256:<hex>
        #[arg(long)]
        hash: String,

        /// Hash the file bytes as-is instead of re-canonicalizing
        #[arg(long)]
        exact: bool,
    },

    /// Write the default configuration file
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let json_logs = ddrgate_config::AppConfig::load()
        .map(|c| c.logging.json)
        .unwrap_or(false);
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Harness {
            scenario,
            golden_dir,
            update,
        } => commands::harness::run(scenario, golden_dir, update).await?,
        Commands::Hash { file } => commands::hash::run(&file).await?,
        Commands::Verify { file, hash, exact } => {
            commands::verify::run(&file, &hash, exact).await?
        }
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
    }

    Ok(())
}
