//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`boundaries`] - Boundary file and manifest generation for a layer
//! - [`config`] - Configuration management (init, show, path)
//! - [`ingest`] - Download and transform remote layers
//! - [`ledger`] - Processing ledger status and reset
//! - [`serve`] - Tile query server

pub mod boundaries;
pub mod config;
pub mod ingest;
pub mod ledger;
pub mod serve;
