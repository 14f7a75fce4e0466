//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::layer::LayerRegistry;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Ingestion settings
    pub processing: ProcessingSettings,
    /// Remote source hosts
    pub servers: ServerSettings,
    /// Query service settings
    pub tile_server: TileServerSettings,
    /// Logging settings
    pub logging: LoggingSettings,
    /// Layer registry: built-in defaults overlaid by `[layer.NAME]` sections
    pub layers: LayerRegistry,
}

/// Ingestion configuration.
#[derive(Debug, Clone)]
pub struct ProcessingSettings {
    /// Global simplification tolerance; unset falls back to the built-in default
    pub base_tolerance: Option<f64>,
    /// Root directory for artifacts (one subdirectory per layer) and the ledger
    pub output_dir: PathBuf,
    /// Attempts against the primary transport before falling back
    pub max_retries: u32,
    /// Per-attempt timeout in seconds
    pub timeout: u64,
    /// Layers processed concurrently during a batch
    pub parallel_downloads: usize,
    /// Backoff time unit in milliseconds (sleep is unit * 2^attempt)
    pub backoff_unit_ms: u64,
}

impl ProcessingSettings {
    /// Path of the processing ledger.
    pub fn ledger_path(&self) -> PathBuf {
        self.output_dir.join(super::LEDGER_FILE_NAME)
    }

    /// Directory holding the artifacts of one layer.
    pub fn layer_dir(&self, layer: &str) -> PathBuf {
        self.output_dir.join(layer)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

/// Remote source hosts.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// FTP host tried first
    pub primary_host: String,
    /// HTTPS host used once the primary is exhausted
    pub secondary_host: String,
    /// Path of the dataset root on both hosts
    pub base_path: String,
}

/// Tile query service configuration.
#[derive(Debug, Clone)]
pub struct TileServerSettings {
    /// Listen address
    pub bind: SocketAddr,
    /// Layer whose artifacts are served
    pub layer: String,
    /// Per-client request ceiling
    pub requests_per_second: u32,
    /// Query cache time-to-live in seconds
    pub cache_ttl_secs: u64,
    /// Query cache capacity
    pub cache_max_entries: usize,
    /// Simultaneous file operations allowed
    pub max_file_operations: usize,
    /// Boundary file name inside the served layer directory
    pub boundary_file: String,
}

impl TileServerSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
