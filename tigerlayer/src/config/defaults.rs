//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use super::settings::*;
use crate::artifact::BOUNDARY_FILE;
use crate::layer::LayerRegistry;

// =============================================================================
// Processing defaults
// =============================================================================

/// Default attempts against the primary transport.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-attempt timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default number of layers processed concurrently.
pub const DEFAULT_PARALLEL_DOWNLOADS: usize = 4;

/// Default backoff unit (one second).
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1000;

/// Ledger file name inside the output directory.
pub const LEDGER_FILE_NAME: &str = "processed_files.csv";

// =============================================================================
// Server defaults
// =============================================================================

pub const DEFAULT_PRIMARY_HOST: &str = "ftp2.census.gov";
pub const DEFAULT_SECONDARY_HOST: &str = "www2.census.gov";
pub const DEFAULT_BASE_PATH: &str = "/geo/tiger/TIGER2023";

// =============================================================================
// Tile server defaults
// =============================================================================

pub const DEFAULT_BIND_PORT: u16 = 8000;
pub const DEFAULT_SERVED_LAYER: &str = "PRIMARYROADS";
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// Default query cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1024;
pub const DEFAULT_MAX_FILE_OPERATIONS: usize = 32;

// =============================================================================
// ConfigFile::default()
// =============================================================================

impl Default for ConfigFile {
    fn default() -> Self {
        let output_dir = PathBuf::from("output");

        Self {
            processing: ProcessingSettings {
                base_tolerance: None,
                output_dir: output_dir.clone(),
                max_retries: DEFAULT_MAX_RETRIES,
                timeout: DEFAULT_TIMEOUT_SECS,
                parallel_downloads: DEFAULT_PARALLEL_DOWNLOADS,
                backoff_unit_ms: DEFAULT_BACKOFF_UNIT_MS,
            },
            servers: ServerSettings {
                primary_host: DEFAULT_PRIMARY_HOST.to_string(),
                secondary_host: DEFAULT_SECONDARY_HOST.to_string(),
                base_path: DEFAULT_BASE_PATH.to_string(),
            },
            tile_server: TileServerSettings {
                bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_BIND_PORT)),
                layer: DEFAULT_SERVED_LAYER.to_string(),
                requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
                cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
                cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
                max_file_operations: DEFAULT_MAX_FILE_OPERATIONS,
                boundary_file: BOUNDARY_FILE.to_string(),
            },
            logging: LoggingSettings {
                file: output_dir.join("logs").join("tigerlayer.log"),
            },
            layers: LayerRegistry::with_defaults(),
        }
    }
}
