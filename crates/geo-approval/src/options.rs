//! Options threaded through the verification entry points.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dataset::LabeledDataset;
use crate::diff::{Differ, Tolerance};
use crate::format::ArtifactFormat;
use crate::scrub::{RecursiveScrubber, SequenceScrubber};
use crate::utils::error::ArtifactError;
use crate::verify::Namer;

/// Persists an in-memory dataset before it is verified
pub type DatasetWriter =
    Arc<dyn Fn(&Path, &LabeledDataset) -> Result<(), ArtifactError> + Send + Sync>;

/// Maps raster tags to scenario names appended to the approval name
pub type ScenarioByTags = Arc<dyn Fn(&BTreeMap<String, String>) -> Vec<String> + Send + Sync>;

/// Verification options
///
/// Every `with_*` call returns a new value; unset fields fall back to
/// identity scrubbers, the default tolerance and the format's own writer.
#[derive(Clone, Default)]
pub struct GeoOptions {
    tags_scrubber: Option<RecursiveScrubber>,
    coords_scrubber: Option<SequenceScrubber>,
    tolerance: Option<Tolerance>,
    writer: Option<DatasetWriter>,
    scenario_by_tags: Option<ScenarioByTags>,
    namer: Option<Namer>,
    approved_directory: Option<PathBuf>,
    tmp_directory: Option<PathBuf>,
}

impl GeoOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags_scrubber(mut self, scrubber: RecursiveScrubber) -> Self {
        self.tags_scrubber = Some(scrubber);
        self
    }

    pub fn with_coords_scrubber(mut self, scrubber: SequenceScrubber) -> Self {
        self.coords_scrubber = Some(scrubber);
        self
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_writer<W>(mut self, writer: W) -> Self
    where
        W: Fn(&Path, &LabeledDataset) -> Result<(), ArtifactError> + Send + Sync + 'static,
    {
        self.writer = Some(Arc::new(writer));
        self
    }

    pub fn with_scenario_by_tags<S>(mut self, tags_to_names: S) -> Self
    where
        S: Fn(&BTreeMap<String, String>) -> Vec<String> + Send + Sync + 'static,
    {
        self.scenario_by_tags = Some(Arc::new(tags_to_names));
        self
    }

    pub fn with_namer(mut self, namer: Namer) -> Self {
        self.namer = Some(namer);
        self
    }

    pub fn with_approved_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.approved_directory = Some(directory.into());
        self
    }

    pub fn with_tmp_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.tmp_directory = Some(directory.into());
        self
    }

    pub fn has_tags_scrubber(&self) -> bool {
        self.tags_scrubber.is_some()
    }

    pub fn has_coords_scrubber(&self) -> bool {
        self.coords_scrubber.is_some()
    }

    pub fn has_scenario_by_tags(&self) -> bool {
        self.scenario_by_tags.is_some()
    }

    pub fn tags_scrubber(&self) -> RecursiveScrubber {
        self.tags_scrubber.clone().unwrap_or_default()
    }

    pub fn coords_scrubber(&self) -> SequenceScrubber {
        self.coords_scrubber.clone().unwrap_or_default()
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance.unwrap_or_default()
    }

    pub fn writer(&self) -> Option<&DatasetWriter> {
        self.writer.as_ref()
    }

    /// Scenario names for a tag set; empty when no mapping is configured
    pub fn scenario_names(&self, tags: &BTreeMap<String, String>) -> Vec<String> {
        self.scenario_by_tags
            .as_ref()
            .map(|f| f(tags))
            .unwrap_or_default()
    }

    pub fn namer(&self) -> Option<&Namer> {
        self.namer.as_ref()
    }

    pub fn approved_directory(&self) -> Option<&Path> {
        self.approved_directory.as_deref()
    }

    /// Scratch directory for in-memory artifacts; unset means a fresh
    /// temporary directory per verification
    pub fn tmp_directory(&self) -> Option<&Path> {
        self.tmp_directory.as_deref()
    }

    /// A differ for `format` configured with these options
    pub fn differ<F: ArtifactFormat>(&self, format: F) -> Differ<F> {
        Differ::new(format)
            .with_tags_scrubber(self.tags_scrubber())
            .with_coords_scrubber(self.coords_scrubber())
            .with_tolerance(self.tolerance())
    }
}

impl fmt::Debug for GeoOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoOptions")
            .field("tags_scrubber", &self.tags_scrubber)
            .field("coords_scrubber", &self.coords_scrubber)
            .field("tolerance", &self.tolerance)
            .field("writer", &self.writer.is_some())
            .field("scenario_by_tags", &self.scenario_by_tags.is_some())
            .field("namer", &self.namer)
            .field("approved_directory", &self.approved_directory)
            .field("tmp_directory", &self.tmp_directory)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrub::date_scrubber;

    #[test]
    fn test_defaults() {
        let options = GeoOptions::new();
        assert!(!options.has_tags_scrubber());
        assert!(!options.has_coords_scrubber());
        assert_eq!(options.tolerance(), Tolerance::default());
        assert!(options.writer().is_none());
        assert!(options.scenario_names(&BTreeMap::new()).is_empty());
        assert!(options.approved_directory().is_none());
    }

    #[test]
    fn test_builders_leave_the_original_untouched() {
        let base = GeoOptions::new().with_approved_directory("approved");
        let tuned = base
            .clone()
            .with_tolerance(Tolerance::new(0.1, 0.2).unwrap())
            .with_tags_scrubber(RecursiveScrubber::new(date_scrubber().unwrap()));

        assert_eq!(base.tolerance(), Tolerance::default());
        assert!(!base.has_tags_scrubber());
        assert_eq!(tuned.tolerance().rel, 0.1);
        assert!(tuned.has_tags_scrubber());
        assert_eq!(tuned.approved_directory(), Some(Path::new("approved")));
    }

    #[test]
    fn test_scenario_by_tags() {
        let options = GeoOptions::new().with_scenario_by_tags(|tags| {
            tags.get("band").map(|b| vec![b.clone()]).unwrap_or_default()
        });
        let tags = BTreeMap::from([("band".to_string(), "VV".to_string())]);
        assert_eq!(options.scenario_names(&tags), vec!["VV"]);
    }

    #[test]
    fn test_tmp_directory_override() {
        let options = GeoOptions::new().with_tmp_directory("/scratch");
        assert_eq!(options.tmp_directory(), Some(Path::new("/scratch")));
        assert!(GeoOptions::new().tmp_directory().is_none());
    }
}
