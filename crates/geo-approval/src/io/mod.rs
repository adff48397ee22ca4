//! Artifact readers and writers.
//!
//! This module handles moving datasets between disk and memory:
//! - single-file rasters with flat tags
//! - single-file multi-variable datasets
//! - directory-based chunked archives

pub mod archive;
pub mod dataset_file;
pub mod raster;

// Re-export main functions
pub use archive::{create_empty_archive, open_archive, write_archive, ArchiveWriter};
pub use dataset_file::{create_empty_dataset_file, open_dataset_file, write_dataset_file};
pub use raster::{create_empty_raster, open_raster, write_raster, GeoRaster};

use crate::utils::error::ArtifactError;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use walkdir::WalkDir;

/// Create the parent directory of `path` if it does not exist yet
pub fn ensure_parent(path: &Path) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Read a JSON document
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    debug!("Reading JSON from: {}", path.display());
    let file = File::open(path).map_err(|e| ArtifactError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| ArtifactError::json(path, e))
}

/// Write a pretty-printed JSON document, creating parent directories
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| ArtifactError::io(path, e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| ArtifactError::json(path, e))
}

/// Remove a file or a whole directory tree
pub fn remove_artifact(path: &Path) -> Result<(), ArtifactError> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| ArtifactError::io(path, e))
}

/// Copy a file artifact or a directory tree to `destination`
///
/// An existing destination is replaced.
pub fn copy_artifact(source: &Path, destination: &Path) -> Result<(), ArtifactError> {
    if destination.exists() {
        remove_artifact(destination)?;
    }
    ensure_parent(destination)?;

    if !source.is_dir() {
        fs::copy(source, destination).map_err(|e| ArtifactError::io(source, e))?;
        info!("Copied {} to {}", source.display(), destination.display());
        return Ok(());
    }

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            ArtifactError::io(path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| ArtifactError::malformed(entry.path(), "entry outside of source tree"))?;
        let target = destination.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| ArtifactError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| ArtifactError::io(entry.path(), e))?;
        }
    }
    info!(
        "Copied directory {} to {}",
        source.display(),
        destination.display()
    );
    Ok(())
}
