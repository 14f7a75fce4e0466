//! TigerLayer - resilient TIGER/Line ingestion and spatial tile lookup
//!
//! Two subsystems share only the artifact naming convention and the boundary
//! file format:
//!
//! - [`ingest`] downloads source archives (FTP first, HTTPS fallback),
//!   transforms each one into a simplified artifact named by the geohash of
//!   its center, and records every attempt in the processing [`ledger`].
//! - [`server`] answers "which artifacts intersect this viewport" from the
//!   layer's boundary file, with per-client rate limiting, a TTL query cache
//!   and a bounded number of concurrent file operations.
//!
//! ```ignore
//! use tigerlayer::config::ConfigFile;
//! use tigerlayer::ingest::IngestionPipeline;
//!
//! let config = ConfigFile::load()?;
//! let pipeline = IngestionPipeline::from_config(&config)?;
//! let outcome = pipeline.process_one("COUNTY", "tl_2023_us_county.zip").await;
//! ```

pub mod artifact;
pub mod boundary;
pub mod config;
pub mod download;
pub mod engine;
pub mod geohash;
pub mod ingest;
pub mod layer;
pub mod ledger;
pub mod logging;
pub mod server;
pub mod spatial;
pub mod transport;
pub mod workspace;

/// Version of the TigerLayer library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
