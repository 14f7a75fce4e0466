//! TigerLayer CLI - Command-line interface
//!
//! This binary drives the TigerLayer library: ingestion of remote layers,
//! post-processing of layer directories, the tile query server and
//! maintenance of the processing ledger and configuration.

mod commands;
mod error;
mod runner;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::ingest::IngestArgs;
use commands::ledger::LedgerAction;
use commands::serve::ServeArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "tigerlayer")]
#[command(version = tigerlayer::VERSION)]
#[command(about = "Ingest TIGER/Line layers and serve spatial tile lookups", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.tigerlayer/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging regardless of RUST_LOG
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, transform and record every file of the selected layers
    Ingest {
        /// Layer to process (repeatable); all remote layers when omitted
        #[arg(long = "layer", value_name = "NAME")]
        layers: Vec<String>,

        /// Report what would be processed without downloading anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Write tile_boundaries.geojson for an ingested layer
    Boundaries {
        #[arg(long, value_name = "NAME")]
        layer: String,
    },

    /// Write manifest.json for an ingested layer
    Manifest {
        #[arg(long, value_name = "NAME")]
        layer: String,
    },

    /// Serve viewport queries and artifacts over HTTP
    Serve {
        /// Listen address (overrides tile_server.bind)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Layer to serve (overrides tile_server.layer)
        #[arg(long, value_name = "NAME")]
        layer: Option<String>,
    },

    /// Inspect or reset the processing ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config { command } => commands::config::run(config_path, command),
        Commands::Ingest { layers, dry_run } => {
            let runner = CliRunner::new(config_path, cli.debug, cli.debug)?;
            commands::ingest::run(&runner, IngestArgs { layers, dry_run }).await
        }
        Commands::Boundaries { layer } => {
            let runner = CliRunner::new(config_path, cli.debug, cli.debug)?;
            commands::boundaries::run_boundaries(&runner, &layer)
        }
        Commands::Manifest { layer } => {
            let runner = CliRunner::new(config_path, cli.debug, cli.debug)?;
            commands::boundaries::run_manifest(&runner, &layer)
        }
        Commands::Serve { bind, layer } => {
            // A long-running server logs to the terminal as well
            let runner = CliRunner::new(config_path, cli.debug, true)?;
            commands::serve::run(&runner, ServeArgs { bind, layer }).await
        }
        Commands::Ledger { action } => {
            let runner = CliRunner::new(config_path, cli.debug, cli.debug)?;
            commands::ledger::run(&runner, action)
        }
    }
}
