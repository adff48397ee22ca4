//! Human-readable difference reports.

use log::info;
use std::io::{self, Write};
use std::path::Path;

use crate::diff::{print_diffs, DiffError, Differ};
use crate::format::ArtifactFormat;

/// Prints what differs between a received and an approved artifact
#[derive(Debug, Clone)]
pub struct Reporter<F> {
    differ: Differ<F>,
}

impl<F: ArtifactFormat> Reporter<F> {
    pub fn new(differ: Differ<F>) -> Self {
        Self { differ }
    }

    /// Report to standard output
    pub fn report(&self, received: &Path, approved: &Path) -> Result<bool, DiffError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.report_to(received, approved, &mut out)
    }

    /// Write the difference report for a pair of artifacts
    ///
    /// A missing approved artifact is first created as an empty placeholder
    /// so a first run shows everything as different. Nothing is written when
    /// the artifacts are equivalent. Always returns `true`; failing the test
    /// is left to the comparator.
    ///
    /// # Errors
    /// * `DiffError::Artifact` - If an artifact cannot be read or the placeholder written
    /// * `DiffError::Report` - If writing to `out` fails
    pub fn report_to<W: Write>(
        &self,
        received: &Path,
        approved: &Path,
        out: &mut W,
    ) -> Result<bool, DiffError> {
        let format = self.differ.format();
        if !approved.exists() {
            info!(
                "Creating empty {} placeholder at {}",
                format.name(),
                approved.display()
            );
            format.create_empty(approved)?;
        }

        let diffs = self.differ.diffs(received, approved)?;
        if !diffs.is_empty() {
            print_diffs(&diffs, out)?;
            writeln!(
                out,
                "To approve run:\n{}",
                format.approval_command(received, approved)
            )?;
        }
        Ok(true)
    }
}
