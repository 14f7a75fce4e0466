//! Artifact naming convention shared by ingestion and serving.
//!
//! An artifact produced from `tl_2023_01001_roads.zip` whose geometry is
//! centered in geohash cell `djf8k` is stored as
//! `tl_2023_01001_roads.djf8k.geojson`. The tile server relies only on the
//! second-to-last dot segment to find artifacts for a bucket.

use crate::geohash::ARTIFACT_PRECISION;

/// Boundary description written next to a layer's artifacts.
pub const BOUNDARY_FILE: &str = "tile_boundaries.geojson";

/// Sorted artifact listing written next to a layer's artifacts.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Suffix used while an artifact is being written.
pub const PARTIAL_SUFFIX: &str = "partial";

/// Archive extension stripped from source filenames.
const SOURCE_EXTENSION: &str = ".zip";

/// A parsed artifact filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName<'a> {
    pub base: &'a str,
    pub code: &'a str,
    pub extension: &'a str,
}

impl<'a> ArtifactName<'a> {
    /// Parse `<base>.<code>.<ext>`; returns `None` for anything else.
    pub fn parse(filename: &'a str) -> Option<Self> {
        let (rest, extension) = filename.rsplit_once('.')?;
        let (base, code) = rest.rsplit_once('.')?;

        if base.is_empty() || extension.is_empty() || extension == PARTIAL_SUFFIX {
            return None;
        }
        if code.len() != ARTIFACT_PRECISION || !is_geohash(code) {
            return None;
        }

        Some(Self {
            base,
            code,
            extension,
        })
    }
}

/// Strips the archive extension from a source filename.
pub fn base_name(source_filename: &str) -> &str {
    source_filename
        .strip_suffix(SOURCE_EXTENSION)
        .unwrap_or(source_filename)
}

/// Builds the artifact filename for a source file and bucket code.
pub fn artifact_filename(source_filename: &str, code: &str, extension: &str) -> String {
    format!("{}.{}.{}", base_name(source_filename), code, extension)
}

fn is_geohash(code: &str) -> bool {
    code.chars()
        .all(|c| c.is_ascii_digit() || (c.is_ascii_lowercase() && !matches!(c, 'a' | 'i' | 'l' | 'o')))
}
