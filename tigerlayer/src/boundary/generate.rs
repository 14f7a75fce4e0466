//! Post-ingestion generation of boundary and manifest files.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{BoundaryCollection, BoundaryError, BoundaryFeature, TileBoundary};
use crate::artifact::{ArtifactName, BOUNDARY_FILE, MANIFEST_FILE};
use crate::spatial::Bounds;

/// Result of a boundary generation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    /// Features written to the boundary file.
    pub written: usize,
    /// Artifacts skipped because they were unreadable or lacked a `bbox`.
    pub failed: usize,
    /// Path of the written file.
    pub output: PathBuf,
}

/// Scan a layer directory and write `tile_boundaries.geojson`.
///
/// Each artifact contributes one rectangle built from its top-level `bbox`;
/// the bucket code comes from the artifact's filename. Unreadable artifacts
/// are counted and skipped rather than aborting the pass.
pub fn generate_boundaries(layer_dir: &Path) -> Result<GenerationReport, BoundaryError> {
    info!(directory = %layer_dir.display(), "Generating tile boundaries");

    let mut features = Vec::new();
    let mut failed = 0;

    for name in artifact_names(layer_dir)? {
        let Some(artifact) = ArtifactName::parse(&name) else {
            continue;
        };
        let path = layer_dir.join(&name);

        match read_bbox(&path) {
            Ok(Some(bounds)) => {
                debug!(file = %name, code = artifact.code, ?bounds, "Found artifact extent");
                features.push(BoundaryFeature::from_boundary(&TileBoundary {
                    code: artifact.code.to_string(),
                    bounds,
                }));
            }
            Ok(None) => {
                warn!(file = %name, "No bbox found in artifact");
                failed += 1;
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Failed to read artifact");
                failed += 1;
            }
        }
    }

    let output = layer_dir.join(BOUNDARY_FILE);
    let collection = BoundaryCollection::new(features);
    let json = serde_json::to_vec_pretty(&collection).map_err(|e| BoundaryError::Parse {
        path: output.display().to_string(),
        message: e.to_string(),
    })?;
    write_file(&output, &json)?;

    let report = GenerationReport {
        written: collection.features.len(),
        failed,
        output,
    };
    info!(
        written = report.written,
        failed = report.failed,
        output = %report.output.display(),
        "Tile boundaries written"
    );
    Ok(report)
}

/// Write `manifest.json`: the sorted list of artifact filenames in a layer.
pub fn generate_manifest(layer_dir: &Path) -> Result<Vec<String>, BoundaryError> {
    let names: Vec<String> = artifact_names(layer_dir)?
        .into_iter()
        .filter(|name| ArtifactName::parse(name).is_some())
        .collect();

    let output = layer_dir.join(MANIFEST_FILE);
    let json = serde_json::to_vec_pretty(&names).map_err(|e| BoundaryError::Parse {
        path: output.display().to_string(),
        message: e.to_string(),
    })?;
    write_file(&output, &json)?;

    info!(count = names.len(), output = %output.display(), "Manifest written");
    Ok(names)
}

/// Sorted filenames in a directory.
fn artifact_names(dir: &Path) -> Result<Vec<String>, BoundaryError> {
    let io_err = |source| BoundaryError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn read_bbox(path: &Path) -> Result<Option<Bounds>, String> {
    let data = std::fs::read(path).map_err(|e| e.to_string())?;
    let value: serde_json::Value = serde_json::from_slice(&data).map_err(|e| e.to_string())?;

    let Some(bbox) = value.get("bbox").and_then(|b| b.as_array()) else {
        return Ok(None);
    };
    let numbers: Vec<f64> = bbox.iter().filter_map(|v| v.as_f64()).collect();
    if numbers.len() != 4 {
        return Ok(None);
    }

    Ok(Some(Bounds::new(numbers[0], numbers[1], numbers[2], numbers[3])))
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), BoundaryError> {
    std::fs::write(path, data).map_err(|source| BoundaryError::Io {
        path: path.display().to_string(),
        source,
    })
}
