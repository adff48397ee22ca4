//! Equivalence check between a received and an approved artifact.

use log::{debug, info};
use std::fs::File;
use std::path::Path;

use crate::diff::{DiffError, Differ};
use crate::format::ArtifactFormat;
use crate::io::remove_artifact;
use crate::utils::error::ArtifactError;

/// Decides whether a received artifact matches its approved reference
#[derive(Debug, Clone)]
pub struct Comparator<F> {
    differ: Differ<F>,
}

impl<F: ArtifactFormat> Comparator<F> {
    pub fn new(differ: Differ<F>) -> Self {
        Self { differ }
    }

    pub fn differ(&self) -> &Differ<F> {
        &self.differ
    }

    pub fn into_differ(self) -> Differ<F> {
        self.differ
    }

    /// True when both artifacts exist and show no difference
    ///
    /// A missing path is a plain `false`; nothing is opened in that case.
    /// For directory formats an equivalent received directory is replaced
    /// by an empty marker file so it can be cleaned up like a file.
    ///
    /// # Errors
    /// * `DiffError::Artifact` - If an existing artifact cannot be read
    pub fn equivalent(&self, received: &Path, approved: &Path) -> Result<bool, DiffError> {
        if !received.exists() || !approved.exists() {
            debug!(
                "Not comparing: received exists={}, approved exists={}",
                received.exists(),
                approved.exists()
            );
            return Ok(false);
        }

        let equivalent = self.differ.diffs(received, approved)?.is_empty();
        if equivalent && self.differ.format().is_directory() && received != approved {
            collapse_to_marker(received)?;
        }
        Ok(equivalent)
    }
}

fn collapse_to_marker(path: &Path) -> Result<(), ArtifactError> {
    if path.is_dir() {
        remove_artifact(path)?;
        File::create(path).map_err(|e| ArtifactError::io(path, e))?;
        info!("Replaced {} with an empty marker file", path.display());
    }
    Ok(())
}
