//! Approval workflow: name, write, compare, report.
//!
//! A verification copies the artifact under test to its `received` name,
//! compares it with the `approved` artifact next to it and, on mismatch,
//! prints a report and fails.

use log::{debug, info};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::comparator::Comparator;
use crate::dataset::LabeledDataset;
use crate::diff::DiffError;
use crate::format::{ArchiveFormat, ArtifactFormat, DatasetFileFormat, RasterFormat};
use crate::io::{copy_artifact, ensure_parent, open_raster, remove_artifact};
use crate::options::GeoOptions;
use crate::reporter::Reporter;
use crate::utils::error::ArtifactError;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("{received} is not approved; compare it with {approved}")]
    NotApproved { received: PathBuf, approved: PathBuf },

    #[error("Cannot derive an approval name from {0}")]
    Unnamed(PathBuf),

    #[error("In-memory artifacts need a namer")]
    MissingNamer,

    #[error("{} of {total} rows not approved:{}", .failures.len(), list_failures(.failures))]
    Rows {
        total: usize,
        failures: Vec<(PathBuf, VerifyError)>,
    },

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Builds `received` and `approved` paths for one test
///
/// Paths look like `<dir>/<name>[.<scenario>...].approved<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namer {
    directory: PathBuf,
    name: String,
    scenarios: Vec<String>,
    extension: Option<String>,
}

impl Namer {
    pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            scenarios: Vec::new(),
            extension: None,
        }
    }

    /// Name after an artifact: its stem, in `directory` or next to it
    pub fn for_artifact(artifact: &Path, directory: Option<&Path>) -> Option<Self> {
        let name = artifact.file_stem()?.to_str()?.to_string();
        let directory = match directory {
            Some(dir) => dir.to_path_buf(),
            None => artifact.parent()?.to_path_buf(),
        };
        Some(Self::new(directory, name).with_extension_of(artifact))
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenarios.push(scenario.into());
        self
    }

    pub fn with_scenarios<I, S>(mut self, scenarios: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scenarios.extend(scenarios.into_iter().map(Into::into));
        self
    }

    /// Extension including the leading dot
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Take the extension of an artifact path when it has one
    pub fn with_extension_of(self, artifact: &Path) -> Self {
        match artifact.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.with_extension(format!(".{}", ext)),
            None => self,
        }
    }

    pub fn has_extension(&self) -> bool {
        self.extension.is_some()
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `<name>[.<scenario>...]`
    pub fn base_name(&self) -> String {
        std::iter::once(self.name.as_str())
            .chain(self.scenarios.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn approved_path(&self) -> PathBuf {
        self.path_for("approved")
    }

    pub fn received_path(&self) -> PathBuf {
        self.path_for("received")
    }

    fn path_for(&self, state: &str) -> PathBuf {
        let extension = self.extension.as_deref().unwrap_or("");
        self.directory
            .join(format!("{}.{}{}", self.base_name(), state, extension))
    }
}

/// Verify an artifact on disk, reporting to standard output
pub fn verify_artifact<F: ArtifactFormat>(
    format: F,
    artifact: &Path,
    options: &GeoOptions,
) -> Result<(), VerifyError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    verify_artifact_to(format, artifact, options, &mut out)
}

/// Verify an artifact on disk, writing any report to `out`
///
/// # Errors
/// * `VerifyError::NotApproved` - If the received artifact differs from the approved one
/// * `VerifyError::Unnamed` - If no namer is configured and none can be derived
/// * `VerifyError::Artifact` / `VerifyError::Diff` - If artifacts cannot be read or written
pub fn verify_artifact_to<F: ArtifactFormat, W: Write>(
    format: F,
    artifact: &Path,
    options: &GeoOptions,
    out: &mut W,
) -> Result<(), VerifyError> {
    let namer = resolve_namer(&format, artifact, options)?;
    let received = namer.received_path();
    let approved = namer.approved_path();
    debug!(
        "Verifying {} as {}",
        artifact.display(),
        approved.display()
    );

    if artifact != received {
        copy_artifact(artifact, &received)?;
    }

    let comparator = Comparator::new(options.differ(format));
    if comparator.equivalent(&received, &approved)? {
        if received.exists() {
            remove_artifact(&received)?;
        }
        info!("Approved: {}", approved.display());
        return Ok(());
    }

    Reporter::new(comparator.into_differ()).report_to(&received, &approved, out)?;
    Err(VerifyError::NotApproved { received, approved })
}

fn resolve_namer<F: ArtifactFormat>(
    format: &F,
    artifact: &Path,
    options: &GeoOptions,
) -> Result<Namer, VerifyError> {
    let namer = match options.namer() {
        Some(namer) if namer.has_extension() => namer.clone(),
        Some(namer) => namer.clone().with_extension_of(artifact),
        None => Namer::for_artifact(artifact, options.approved_directory())
            .ok_or_else(|| VerifyError::Unnamed(artifact.to_path_buf()))?,
    };
    if namer.has_extension() {
        Ok(namer)
    } else {
        Ok(namer.with_extension(format.extension()))
    }
}

fn list_failures(failures: &[(PathBuf, VerifyError)]) -> String {
    failures
        .iter()
        .map(|(path, err)| format!("\n  {}: {}", path.display(), err))
        .collect()
}

/// Verify one artifact per row, reporting to standard output
pub fn verify_rows<F, I, S>(format: F, rows: I, options: &GeoOptions) -> Result<(), VerifyError>
where
    F: ArtifactFormat,
    I: IntoIterator<Item = (PathBuf, Vec<S>)>,
    S: Into<String>,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    verify_rows_to(format, rows, options, &mut out)
}

/// Verify one artifact per row, writing every report to `out`
///
/// Each row's scenarios extend the configured namer, or the namer derived
/// from the row's artifact. Every row runs even after a failure.
///
/// # Errors
/// * `VerifyError::Rows` - Listing each row that did not verify
pub fn verify_rows_to<F, I, S, W>(
    format: F,
    rows: I,
    options: &GeoOptions,
    out: &mut W,
) -> Result<(), VerifyError>
where
    F: ArtifactFormat,
    I: IntoIterator<Item = (PathBuf, Vec<S>)>,
    S: Into<String>,
    W: Write,
{
    let mut total = 0;
    let mut failures = Vec::new();
    for (artifact, scenarios) in rows {
        total += 1;
        let result = resolve_namer(&format, &artifact, options).and_then(|namer| {
            let row_options = options.clone().with_namer(namer.with_scenarios(scenarios));
            verify_artifact_to(&format, &artifact, &row_options, out)
        });
        if let Err(err) = result {
            debug!("Row {} failed: {}", artifact.display(), err);
            failures.push((artifact, err));
        }
    }

    if failures.is_empty() {
        info!("All {} rows approved", total);
        Ok(())
    } else {
        Err(VerifyError::Rows { total, failures })
    }
}

/// Verify a single-file raster
///
/// When a scenario-by-tags mapping is configured, the raster's tags extend
/// the approval name.
pub fn verify_geo_raster(raster: impl AsRef<Path>, options: &GeoOptions) -> Result<(), VerifyError> {
    let raster = raster.as_ref();
    let options = with_tag_scenarios(raster, options)?;
    verify_artifact(RasterFormat, raster, &options)
}

fn with_tag_scenarios(raster: &Path, options: &GeoOptions) -> Result<GeoOptions, VerifyError> {
    if !options.has_scenario_by_tags() {
        return Ok(options.clone());
    }
    let tags = open_raster(raster)?.tags;
    let scenarios = options.scenario_names(&tags);
    let namer = resolve_namer(&RasterFormat, raster, options)?.with_scenarios(scenarios);
    Ok(options.clone().with_namer(namer))
}

/// Write an in-memory raster dataset to a scratch directory, then verify it
///
/// Without a configured scratch directory a fresh temporary directory is
/// used and removed afterwards.
///
/// # Errors
/// * `VerifyError::MissingNamer` - If `options` has no namer; the scratch
///   file name says nothing about the test
/// * see [`verify_artifact_to`]
pub fn verify_raster_as_geo_raster(
    raster: &LabeledDataset,
    options: &GeoOptions,
) -> Result<(), VerifyError> {
    if options.namer().is_none() {
        return Err(VerifyError::MissingNamer);
    }

    let temp_dir;
    let scratch = match options.tmp_directory() {
        Some(dir) => dir,
        None => {
            temp_dir = tempfile::Builder::new()
                .prefix("geo-approval-")
                .tempdir()
                .map_err(|e| ArtifactError::io(std::env::temp_dir(), e))?;
            temp_dir.path()
        }
    };

    let path = scratch.join("raster.tif");
    ensure_parent(&path)?;
    match options.writer() {
        Some(writer) => writer(&path, raster)?,
        None => RasterFormat.write_dataset(&path, raster)?,
    }
    debug!("In-memory raster written to {}", path.display());
    verify_geo_raster(&path, options)
}

/// Verify a single-file multi-variable dataset
pub fn verify_geo_dataset(dataset: impl AsRef<Path>, options: &GeoOptions) -> Result<(), VerifyError> {
    verify_artifact(DatasetFileFormat, dataset.as_ref(), options)
}

/// Verify a chunked archive directory
pub fn verify_geo_archive(archive: impl AsRef<Path>, options: &GeoOptions) -> Result<(), VerifyError> {
    verify_artifact(ArchiveFormat, archive.as_ref(), options)
}

/// Promote a received artifact to approved, replacing the old one
pub fn approve(received: &Path, approved: &Path) -> Result<(), ArtifactError> {
    if !received.exists() {
        return Err(ArtifactError::malformed(received, "nothing to approve"));
    }
    if approved.exists() {
        remove_artifact(approved)?;
    }
    ensure_parent(approved)?;
    if fs::rename(received, approved).is_err() {
        // rename fails across file systems
        copy_artifact(received, approved)?;
        remove_artifact(received)?;
    }
    info!("Approved {} as {}", received.display(), approved.display());
    Ok(())
}
