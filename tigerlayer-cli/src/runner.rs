//! CLI runner for common setup.
//!
//! Loads configuration and initializes logging so command handlers start
//! from the same state.

use std::path::Path;

use tigerlayer::config::ConfigFile;
use tigerlayer::logging::{init_logging, split_log_path, LoggingGuard};
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps logging active while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Load configuration and initialize logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Explicit config file; `None` uses `~/.tigerlayer/config.ini`
    /// * `debug` - Force debug-level logging regardless of `RUST_LOG`
    /// * `stdout_enabled` - Mirror log output to stdout
    pub fn new(
        config_path: Option<&Path>,
        debug: bool,
        stdout_enabled: bool,
    ) -> Result<Self, CliError> {
        let config = load_config(config_path)?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let logging_guard = init_logging(&log_dir, &log_file, stdout_enabled, debug)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("TigerLayer v{}", tigerlayer::VERSION);
        info!(
            command,
            output_dir = %self.config.processing.output_dir.display(),
            "TigerLayer CLI starting"
        );
    }
}

/// Load the configuration from an explicit path or the default location.
pub fn load_config(config_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match config_path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}
