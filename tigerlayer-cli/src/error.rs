//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use tigerlayer::boundary::BoundaryError;
use tigerlayer::config::ConfigFileError;
use tigerlayer::ingest::IngestError;
use tigerlayer::ledger::LedgerError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Refused to overwrite an existing file
    AlreadyExists(PathBuf),
    /// Failed to set up the ingestion pipeline
    Ingest(IngestError),
    /// Ledger could not be read or reset
    Ledger(LedgerError),
    /// Boundary or manifest generation failed
    Boundaries(BoundaryError),
    /// Tile server failed to bind or stopped with an error
    Serve { bind: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Boundaries(BoundaryError::Io { .. }) => {
                eprintln!();
                eprintln!("Run 'tigerlayer ingest' for the layer first, then");
                eprintln!("'tigerlayer boundaries --layer <LAYER>' to write its boundary file.");
            }
            CliError::AlreadyExists(_) => {
                eprintln!("Use --force to overwrite it.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::AlreadyExists(path) => {
                write!(f, "File already exists: {}", path.display())
            }
            CliError::Ingest(e) => write!(f, "Failed to start ingestion: {}", e),
            CliError::Ledger(e) => write!(f, "Ledger error: {}", e),
            CliError::Boundaries(e) => write!(f, "Boundary error: {}", e),
            CliError::Serve { bind, error } => {
                write!(f, "Tile server error on {}: {}", bind, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Ingest(e) => Some(e),
            CliError::Ledger(e) => Some(e),
            CliError::Boundaries(e) => Some(e),
            CliError::Serve { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<IngestError> for CliError {
    fn from(e: IngestError) -> Self {
        CliError::Ingest(e)
    }
}

impl From<LedgerError> for CliError {
    fn from(e: LedgerError) -> Self {
        CliError::Ledger(e)
    }
}

impl From<BoundaryError> for CliError {
    fn from(e: BoundaryError) -> Self {
        CliError::Boundaries(e)
    }
}
