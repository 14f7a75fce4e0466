//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::layer::{GeometryKind, LayerDescriptor, LayerKind};

/// Prefix of per-layer sections: `[layer.ROADS]`.
pub(super) const LAYER_SECTION_PREFIX: &str = "layer.";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [processing] section
    if let Some(section) = ini.section(Some("processing")) {
        if let Some(v) = non_empty(section, "base_tolerance") {
            let tolerance: f64 = parse_value(
                "processing",
                "base_tolerance",
                v,
                "must be a non-negative number",
            )?;
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(invalid(
                    "processing",
                    "base_tolerance",
                    v,
                    "must be a non-negative number",
                ));
            }
            config.processing.base_tolerance = Some(tolerance);
        }
        if let Some(v) = non_empty(section, "output_dir") {
            config.processing.output_dir = expand_tilde(v);
        }
        if let Some(v) = section.get("max_retries") {
            config.processing.max_retries =
                parse_positive("processing", "max_retries", v, "must be a positive integer")?;
        }
        if let Some(v) = section.get("timeout") {
            config.processing.timeout = parse_positive(
                "processing",
                "timeout",
                v,
                "must be a positive integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("parallel_downloads") {
            config.processing.parallel_downloads = parse_positive(
                "processing",
                "parallel_downloads",
                v,
                "must be a positive integer",
            )?;
        }
        if let Some(v) = section.get("backoff_unit_ms") {
            config.processing.backoff_unit_ms = parse_value(
                "processing",
                "backoff_unit_ms",
                v,
                "must be a non-negative integer (milliseconds)",
            )?;
        }
    }

    // [servers] section
    if let Some(section) = ini.section(Some("servers")) {
        if let Some(v) = non_empty(section, "primary_host") {
            config.servers.primary_host = v.to_string();
        }
        if let Some(v) = non_empty(section, "secondary_host") {
            config.servers.secondary_host = v.to_string();
        }
        if let Some(v) = non_empty(section, "base_path") {
            if !v.starts_with('/') {
                return Err(invalid(
                    "servers",
                    "base_path",
                    v,
                    "must be an absolute path starting with '/'",
                ));
            }
            config.servers.base_path = v.trim_end_matches('/').to_string();
        }
    }

    // [tile_server] section
    if let Some(section) = ini.section(Some("tile_server")) {
        if let Some(v) = section.get("bind") {
            config.tile_server.bind = parse_value(
                "tile_server",
                "bind",
                v,
                "expected an address like '0.0.0.0:8000'",
            )?;
        }
        if let Some(v) = non_empty(section, "layer") {
            config.tile_server.layer = v.to_string();
        }
        if let Some(v) = section.get("requests_per_second") {
            config.tile_server.requests_per_second = parse_positive(
                "tile_server",
                "requests_per_second",
                v,
                "must be a positive integer",
            )?;
        }
        if let Some(v) = section.get("cache_ttl_secs") {
            config.tile_server.cache_ttl_secs = parse_value(
                "tile_server",
                "cache_ttl_secs",
                v,
                "must be a non-negative integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("cache_max_entries") {
            config.tile_server.cache_max_entries = parse_positive(
                "tile_server",
                "cache_max_entries",
                v,
                "must be a positive integer",
            )?;
        }
        if let Some(v) = section.get("max_file_operations") {
            config.tile_server.max_file_operations = parse_positive(
                "tile_server",
                "max_file_operations",
                v,
                "must be a positive integer",
            )?;
        }
        if let Some(v) = non_empty(section, "boundary_file") {
            config.tile_server.boundary_file = v.to_string();
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = expand_tilde(v);
        }
    }

    // [layer.NAME] sections
    for (name, section) in ini.iter() {
        let Some(layer_name) = name.and_then(|n| n.strip_prefix(LAYER_SECTION_PREFIX)) else {
            continue;
        };
        let layer = parse_layer(layer_name, config.layers.get(layer_name), section)?;
        config.layers.insert(layer);
    }

    Ok(config)
}

/// Overlay one `[layer.NAME]` section onto the built-in descriptor, if any.
fn parse_layer(
    name: &str,
    existing: Option<&LayerDescriptor>,
    section: &Properties,
) -> Result<LayerDescriptor, ConfigFileError> {
    let section_name = format!("{}{}", LAYER_SECTION_PREFIX, name);
    if name.is_empty() {
        return Err(invalid(
            &section_name,
            "name",
            name,
            "layer name must not be empty",
        ));
    }

    let mut layer = existing
        .cloned()
        .unwrap_or_else(|| LayerDescriptor::spatial(name, GeometryKind::Polygon));

    if let Some(v) = section.get("enabled") {
        layer.enabled = parse_bool(v);
    }
    if let Some(v) = section.get("kind") {
        layer.kind = LayerKind::from_str(v)
            .map_err(|reason| invalid(&section_name, "kind", v, &reason))?;
    }
    if let Some(v) = section.get("geometry") {
        layer.geometry = if v.trim().is_empty() {
            None
        } else {
            Some(
                GeometryKind::from_str(v)
                    .map_err(|reason| invalid(&section_name, "geometry", v, &reason))?,
            )
        };
    }
    if layer.kind == LayerKind::Relationship && section.get("geometry").is_none() {
        layer.geometry = None;
    }
    if let Some(v) = section.get("tolerance") {
        layer.tolerance = if v.trim().is_empty() {
            None
        } else {
            let tolerance: f64 = parse_value(
                &section_name,
                "tolerance",
                v,
                "must be a non-negative number",
            )?;
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(invalid(
                    &section_name,
                    "tolerance",
                    v,
                    "must be a non-negative number",
                ));
            }
            Some(tolerance)
        };
    }
    if let Some(v) = section.get("skip_patterns") {
        layer.skip_patterns = parse_list(v);
    }

    Ok(layer)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_positive<T>(section: &str, key: &str, value: &str, reason: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    let parsed: T = parse_value(section, key, value, reason)?;
    if parsed <= T::default() {
        return Err(invalid(section, key, value, reason));
    }
    Ok(parsed)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

/// Parse a boolean value from a string.
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Comma separated list, blanks dropped.
pub(super) fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
