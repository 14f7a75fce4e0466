//! Per-file scratch directories and atomic artifact writes.
//!
//! A [`Workspace`] is a uniquely named `extract-*` directory created next to
//! the layer's artifacts. It is removed when dropped, so every exit path of
//! the pipeline cleans up, including early returns and panics.

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

use crate::artifact::PARTIAL_SUFFIX;

const WORKSPACE_PREFIX: &str = "extract-";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Archive contains no files")]
    EmptyArchive,
}

impl WorkspaceError {
    fn io(path: &Path, source: io::Error) -> Self {
        WorkspaceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Scoped extraction directory.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace under `parent`, creating `parent` if needed.
    pub fn create(parent: &Path) -> Result<Self, WorkspaceError> {
        fs::create_dir_all(parent).map_err(|e| WorkspaceError::io(parent, e))?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| WorkspaceError::io(parent, e))?;
        debug!(path = %dir.path().display(), "Workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Unpack a zip archive into the workspace.
    pub fn extract_zip(&self, bytes: &[u8]) -> Result<Vec<PathBuf>, WorkspaceError> {
        extract_zip(self.path(), bytes)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        debug!(path = %self.dir.path().display(), "Workspace removed");
    }
}

/// Unpack `bytes` into `dir`, returning the extracted file paths.
///
/// Entries whose names would escape `dir` are skipped.
pub fn extract_zip(dir: &Path, bytes: &[u8]) -> Result<Vec<PathBuf>, WorkspaceError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "Skipping archive entry outside workspace");
            continue;
        };
        let target = dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| WorkspaceError::io(&target, e))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| WorkspaceError::io(parent, e))?;
        }
        let mut out = File::create(&target).map_err(|e| WorkspaceError::io(&target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| WorkspaceError::io(&target, e))?;
        extracted.push(target);
    }

    if extracted.is_empty() {
        return Err(WorkspaceError::EmptyArchive);
    }
    debug!(dir = %dir.display(), files = extracted.len(), "Archive extracted");
    Ok(extracted)
}

/// Write `bytes` to `dest` via `<dest>.partial` and a rename.
///
/// Readers never observe a half-written artifact.
pub fn persist_atomic(dest: &Path, bytes: &[u8]) -> Result<(), WorkspaceError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| WorkspaceError::io(parent, e))?;
    }
    let mut partial = dest.as_os_str().to_owned();
    partial.push(".");
    partial.push(PARTIAL_SUFFIX);
    let partial = PathBuf::from(partial);

    if let Err(e) = fs::write(&partial, bytes) {
        let _ = fs::remove_file(&partial);
        return Err(WorkspaceError::io(&partial, e));
    }
    fs::rename(&partial, dest).map_err(|e| {
        let _ = fs::remove_file(&partial);
        WorkspaceError::io(dest, e)
    })
}
