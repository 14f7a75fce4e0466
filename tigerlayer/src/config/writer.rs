//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented representation written by `tigerlayer config init`.

use std::fmt::Write;
use std::path::Path;

use super::parser::LAYER_SECTION_PREFIX;
use super::settings::ConfigFile;
use crate::layer::LayerDescriptor;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let base_tolerance = config
        .processing
        .base_tolerance
        .map(|t| t.to_string())
        .unwrap_or_default();

    let mut out = format!(
        r#"[processing]
; Global simplification tolerance in degrees. Empty uses the built-in 0.005.
; A [layer.NAME] tolerance takes precedence over this value.
base_tolerance = {}
; Artifacts are written to <output_dir>/<LAYER>; the ledger lives here too
output_dir = {}
; Attempts against the primary (FTP) host before falling back to HTTPS
max_retries = {}
; Timeout in seconds for a single download attempt
timeout = {}
; Number of layers processed concurrently (files within a layer are sequential)
parallel_downloads = {}
; Backoff unit in milliseconds; retry n sleeps unit * 2^n
backoff_unit_ms = {}

[servers]
; Primary host, reached over anonymous FTP
primary_host = {}
; Secondary host, reached over HTTPS when the primary is exhausted
secondary_host = {}
; Dataset root on both hosts
base_path = {}

[tile_server]
; Listen address for `tigerlayer serve`
bind = {}
; Layer whose artifacts are served
layer = {}
; Maximum requests per second from a single client address
requests_per_second = {}
; How long a viewport query result is reused (seconds)
cache_ttl_secs = {}
; Maximum cached viewport queries before least-recently-used eviction
cache_max_entries = {}
; Simultaneous artifact reads and directory scans
max_file_operations = {}
; Boundary file inside the served layer directory
boundary_file = {}

[logging]
; Log file path (truncated at the start of each session)
file = {}
"#,
        base_tolerance,
        path_to_string(&config.processing.output_dir),
        config.processing.max_retries,
        config.processing.timeout,
        config.processing.parallel_downloads,
        config.processing.backoff_unit_ms,
        config.servers.primary_host,
        config.servers.secondary_host,
        config.servers.base_path,
        config.tile_server.bind,
        config.tile_server.layer,
        config.tile_server.requests_per_second,
        config.tile_server.cache_ttl_secs,
        config.tile_server.cache_max_entries,
        config.tile_server.max_file_operations,
        config.tile_server.boundary_file,
        path_to_string(&config.logging.file),
    );

    out.push_str(
        r#"
; -----------------------------------------------------------------------------
; Layers. One [layer.NAME] section per remote directory.
;   enabled       - process this layer during `tigerlayer ingest`
;   kind          - spatial | relationship (relationship layers are skipped)
;   geometry      - point | polyline | polygon
;   tolerance     - overrides processing.base_tolerance
;   skip_patterns - comma separated globs; matching files are never downloaded
; -----------------------------------------------------------------------------
"#,
    );

    for layer in config.layers.iter() {
        write_layer(&mut out, layer);
    }

    out
}

fn write_layer(out: &mut String, layer: &LayerDescriptor) {
    let geometry = layer.geometry.map(|g| g.to_string()).unwrap_or_default();
    let tolerance = layer.tolerance.map(|t| t.to_string()).unwrap_or_default();

    // Writing to a String cannot fail.
    let _ = write!(
        out,
        "\n[{}{}]\nenabled = {}\nkind = {}\ngeometry = {}\ntolerance = {}\nskip_patterns = {}\n",
        LAYER_SECTION_PREFIX,
        layer.name,
        layer.enabled,
        layer.kind,
        geometry,
        tolerance,
        layer.skip_patterns.join(", "),
    );
}

/// Convert a path to a string for config file output.
fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
