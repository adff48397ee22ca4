//! Core diff engine implementation.
//! Produces the ordered difference list for a received/approved pair.

use log::debug;
use std::path::Path;

use super::allclose::assert_allclose;
use super::attrs::{attrs_to_tags, diff_attrs, tags_to_attrs, unified_tags_diff};
use super::normalizer::normalize;
use super::schema::Difference;
use super::stats::variable_stats;
use super::tolerance::Tolerance;
use super::DiffError;
use crate::dataset::LabeledDataset;
use crate::format::{ArtifactFormat, OpenedArtifact};
use crate::scrub::{RecursiveScrubber, SequenceScrubber};
use crate::utils::config::RASTER_VARIABLE;

/// Compares two artifacts of one format
#[derive(Debug, Clone)]
pub struct Differ<F> {
    format: F,
    tags_scrubber: RecursiveScrubber,
    coords_scrubber: SequenceScrubber,
    tolerance: Tolerance,
}

impl<F: ArtifactFormat> Differ<F> {
    /// Differ with identity scrubbers and the default tolerance
    pub fn new(format: F) -> Self {
        Self {
            format,
            tags_scrubber: RecursiveScrubber::identity(),
            coords_scrubber: SequenceScrubber::identity(),
            tolerance: Tolerance::default(),
        }
    }

    pub fn with_tags_scrubber(mut self, scrubber: RecursiveScrubber) -> Self {
        self.tags_scrubber = scrubber;
        self
    }

    pub fn with_coords_scrubber(mut self, scrubber: SequenceScrubber) -> Self {
        self.coords_scrubber = scrubber;
        self
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    pub fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    /// Generate the ordered difference list
    ///
    /// Metadata differences come first, then pixel statistics, then the raw
    /// detail of the numeric check. An empty list means equivalent.
    ///
    /// # Errors
    /// * `DiffError::Artifact` - If either artifact cannot be opened
    pub fn diffs(&self, received_path: &Path, approved_path: &Path) -> Result<Vec<Difference>, DiffError> {
        // Step 1: Open and normalize
        debug!(
            "Comparing {} against {}",
            received_path.display(),
            approved_path.display()
        );
        let received = self.format.open(received_path)?;
        let approved = self.format.open(approved_path)?;
        let received_ds = normalize(&received.dataset, &self.tags_scrubber, &self.coords_scrubber);
        let approved_ds = normalize(&approved.dataset, &self.tags_scrubber, &self.coords_scrubber);

        let mut diffs = Vec::new();

        // Step 2: Metadata
        if let Some(diff) = self.flat_tags_diff(received_path, &received, approved_path, &approved) {
            diffs.push(diff);
        }
        diffs.extend(common_metadata_diffs(&received_ds, &approved_ds));
        debug!("Metadata phase found {} difference(s)", diffs.len());

        // Step 3: Numeric comparison
        if let Err(mismatch) = assert_allclose(&received_ds, &approved_ds, &self.tolerance) {
            debug!("Numeric check failed with {} finding(s)", mismatch.details.len());
            let flat_tags = received.flat_tags.is_some() && approved.flat_tags.is_some();
            let stats = if flat_tags {
                raster_stats(&received_ds, &approved_ds)
            } else {
                per_variable_stats(&received_ds, &approved_ds)
            };
            if let Some(stats) = stats {
                diffs.push(Difference::pixel_stats(stats));
            }
            diffs.push(Difference::dataset(mismatch.to_string()));
        }

        // Step 4: Result assembly is implicit in the push order
        Ok(diffs)
    }

    fn flat_tags_diff(
        &self,
        received_path: &Path,
        received: &OpenedArtifact,
        approved_path: &Path,
        approved: &OpenedArtifact,
    ) -> Option<Difference> {
        let (received_tags, approved_tags) = match (&received.flat_tags, &approved.flat_tags) {
            (Some(r), Some(a)) => (r, a),
            _ => return None,
        };
        let received_tags = attrs_to_tags(&self.tags_scrubber.scrub(&tags_to_attrs(received_tags)));
        let approved_tags = attrs_to_tags(&self.tags_scrubber.scrub(&tags_to_attrs(approved_tags)));
        let diff = unified_tags_diff(
            &file_name(approved_path),
            &approved_tags,
            &file_name(received_path),
            &received_tags,
        );
        (!diff.is_empty()).then(|| Difference::tags(diff))
    }
}

/// One TAGS difference per differing attribute set
///
/// Covers the global attributes and every data variable and coordinate
/// present in both datasets. Names found on one side only are left to the
/// numeric check.
pub fn common_metadata_diffs(received: &LabeledDataset, approved: &LabeledDataset) -> Vec<Difference> {
    let mut diffs = Vec::new();

    let global = diff_attrs(&approved.attrs, &received.attrs);
    if !global.is_empty() {
        diffs.push(Difference::tags(format!("Global attributes:\n{}", global)));
    }
    for name in received.common_data_vars(approved) {
        let diff = diff_attrs(&approved.data_vars[&name].attrs, &received.data_vars[&name].attrs);
        if !diff.is_empty() {
            diffs.push(Difference::tags(format!(
                "Attributes of data variable '{}':\n{}",
                name, diff
            )));
        }
    }
    for name in received.common_coords(approved) {
        let diff = diff_attrs(&approved.coords[&name].attrs, &received.coords[&name].attrs);
        if !diff.is_empty() {
            diffs.push(Difference::tags(format!(
                "Attributes of coordinate '{}':\n{}",
                name, diff
            )));
        }
    }
    diffs
}

// "name: stats" per common data variable with a detectable difference
fn per_variable_stats(received: &LabeledDataset, approved: &LabeledDataset) -> Option<String> {
    let lines: Vec<String> = received
        .common_data_vars(approved)
        .into_iter()
        .filter_map(|name| {
            let stats = variable_stats(&name, &approved.data_vars[&name], &received.data_vars[&name])?;
            (!stats.is_empty()).then(|| format!("{}: {}", name, stats))
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn raster_stats(received: &LabeledDataset, approved: &LabeledDataset) -> Option<String> {
    let stats = variable_stats(
        RASTER_VARIABLE,
        approved.data_vars.get(RASTER_VARIABLE)?,
        received.data_vars.get(RASTER_VARIABLE)?,
    )?;
    Some(format!("pixel differences statistics:\n{}", stats))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
