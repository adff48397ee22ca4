//! Artifact format strategies.
//!
//! Every supported artifact kind shares one comparison pipeline; what
//! differs is how it is opened, what an empty placeholder looks like, and
//! how a received artifact is promoted to approved. Those three concerns are
//! bundled behind [`ArtifactFormat`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::dataset::LabeledDataset;
use crate::io::{
    create_empty_archive, create_empty_dataset_file, create_empty_raster, open_archive,
    open_dataset_file, open_raster, write_archive, write_dataset_file, write_raster, GeoRaster,
};
use crate::utils::error::ArtifactError;

/// An artifact opened for comparison
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedArtifact {
    pub dataset: LabeledDataset,

    /// Flat string tags, for formats that keep them outside the attributes
    pub flat_tags: Option<BTreeMap<String, String>>,
}

impl From<LabeledDataset> for OpenedArtifact {
    fn from(dataset: LabeledDataset) -> Self {
        Self {
            dataset,
            flat_tags: None,
        }
    }
}

/// Format-specific behaviour of the comparison pipeline
pub trait ArtifactFormat: Send + Sync {
    /// Short name used on the command line
    fn name(&self) -> &'static str;

    /// File extension including the dot
    fn extension(&self) -> &'static str;

    /// Whether artifacts are directories rather than single files
    fn is_directory(&self) -> bool {
        false
    }

    fn open(&self, path: &Path) -> Result<OpenedArtifact, ArtifactError>;

    /// Write the minimal valid artifact of this format
    fn create_empty(&self, path: &Path) -> Result<(), ArtifactError>;

    /// Persist an in-memory dataset in this format
    fn write_dataset(&self, path: &Path, dataset: &LabeledDataset) -> Result<(), ArtifactError>;

    /// Shell command accepting `received` as the new `approved`
    fn approval_command(&self, received: &Path, approved: &Path) -> String {
        file_move_command(received, approved)
    }
}

impl<T: ArtifactFormat + ?Sized> ArtifactFormat for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn extension(&self) -> &'static str {
        (**self).extension()
    }

    fn is_directory(&self) -> bool {
        (**self).is_directory()
    }

    fn open(&self, path: &Path) -> Result<OpenedArtifact, ArtifactError> {
        (**self).open(path)
    }

    fn create_empty(&self, path: &Path) -> Result<(), ArtifactError> {
        (**self).create_empty(path)
    }

    fn write_dataset(&self, path: &Path, dataset: &LabeledDataset) -> Result<(), ArtifactError> {
        (**self).write_dataset(path, dataset)
    }

    fn approval_command(&self, received: &Path, approved: &Path) -> String {
        (**self).approval_command(received, approved)
    }
}

impl<T: ArtifactFormat + ?Sized> ArtifactFormat for &T {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn extension(&self) -> &'static str {
        (**self).extension()
    }

    fn is_directory(&self) -> bool {
        (**self).is_directory()
    }

    fn open(&self, path: &Path) -> Result<OpenedArtifact, ArtifactError> {
        (**self).open(path)
    }

    fn create_empty(&self, path: &Path) -> Result<(), ArtifactError> {
        (**self).create_empty(path)
    }

    fn write_dataset(&self, path: &Path, dataset: &LabeledDataset) -> Result<(), ArtifactError> {
        (**self).write_dataset(path, dataset)
    }

    fn approval_command(&self, received: &Path, approved: &Path) -> String {
        (**self).approval_command(received, approved)
    }
}

/// Single-file rasters with flat tags
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterFormat;

impl ArtifactFormat for RasterFormat {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn extension(&self) -> &'static str {
        ".tif"
    }

    fn open(&self, path: &Path) -> Result<OpenedArtifact, ArtifactError> {
        let raster = open_raster(path)?;
        Ok(OpenedArtifact {
            dataset: raster.to_dataset(),
            flat_tags: Some(raster.tags),
        })
    }

    fn create_empty(&self, path: &Path) -> Result<(), ArtifactError> {
        create_empty_raster(path)
    }

    fn write_dataset(&self, path: &Path, dataset: &LabeledDataset) -> Result<(), ArtifactError> {
        write_raster(path, &GeoRaster::from_dataset(dataset, path)?)
    }
}

/// Single-file multi-variable datasets
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetFileFormat;

impl ArtifactFormat for DatasetFileFormat {
    fn name(&self) -> &'static str {
        "dataset"
    }

    fn extension(&self) -> &'static str {
        ".nc"
    }

    fn open(&self, path: &Path) -> Result<OpenedArtifact, ArtifactError> {
        open_dataset_file(path).map(OpenedArtifact::from)
    }

    fn create_empty(&self, path: &Path) -> Result<(), ArtifactError> {
        create_empty_dataset_file(path)
    }

    fn write_dataset(&self, path: &Path, dataset: &LabeledDataset) -> Result<(), ArtifactError> {
        write_dataset_file(path, dataset)
    }
}

/// Directory-based chunked archives
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveFormat;

impl ArtifactFormat for ArchiveFormat {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn extension(&self) -> &'static str {
        ".zarr"
    }

    fn is_directory(&self) -> bool {
        true
    }

    fn open(&self, path: &Path) -> Result<OpenedArtifact, ArtifactError> {
        open_archive(path).map(OpenedArtifact::from)
    }

    fn create_empty(&self, path: &Path) -> Result<(), ArtifactError> {
        create_empty_archive(path)
    }

    fn write_dataset(&self, path: &Path, dataset: &LabeledDataset) -> Result<(), ArtifactError> {
        write_archive(path, dataset)
    }

    fn approval_command(&self, received: &Path, approved: &Path) -> String {
        directory_move_command(received, approved)
    }
}

/// Command replacing one file with another
pub fn file_move_command(received: &Path, approved: &Path) -> String {
    if cfg!(windows) {
        format!(
            "move /Y \"{}\" \"{}\"",
            received.display(),
            approved.display()
        )
    } else {
        format!(
            "mv -f \"{}\" \"{}\"",
            received.display(),
            approved.display()
        )
    }
}

/// Command replacing one directory tree with another
pub fn directory_move_command(received: &Path, approved: &Path) -> String {
    if cfg!(windows) {
        format!(
            "rmdir /S /Q \"{approved}\" && move /Y \"{received}\" \"{approved}\"",
            approved = approved.display(),
            received = received.display()
        )
    } else {
        format!(
            "rm -rf \"{approved}\" && mv -f \"{received}\" \"{approved}\"",
            approved = approved.display(),
            received = received.display()
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown artifact format '{0}' (expected raster, dataset or archive)")]
pub struct UnknownFormat(pub String);

/// The supported artifact formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Raster,
    Dataset,
    Archive,
}

impl FormatKind {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "tif" | "tiff" => Some(FormatKind::Raster),
            "nc" => Some(FormatKind::Dataset),
            "zarr" => Some(FormatKind::Archive),
            _ => None,
        }
    }

    pub fn format(&self) -> Box<dyn ArtifactFormat> {
        match self {
            FormatKind::Raster => Box::new(RasterFormat),
            FormatKind::Dataset => Box::new(DatasetFileFormat),
            FormatKind::Archive => Box::new(ArchiveFormat),
        }
    }
}

impl FromStr for FormatKind {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raster" | "tif" | "tiff" => Ok(FormatKind::Raster),
            "dataset" | "nc" | "netcdf" => Ok(FormatKind::Dataset),
            "archive" | "zarr" => Ok(FormatKind::Archive),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.format().name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_kind_from_path() {
        assert_eq!(
            FormatKind::from_path(Path::new("a/b.approved.tif")),
            Some(FormatKind::Raster)
        );
        assert_eq!(FormatKind::from_path(Path::new("x.TIFF")), Some(FormatKind::Raster));
        assert_eq!(FormatKind::from_path(Path::new("x.nc")), Some(FormatKind::Dataset));
        assert_eq!(FormatKind::from_path(Path::new("x.zarr")), Some(FormatKind::Archive));
        assert_eq!(FormatKind::from_path(Path::new("x.csv")), None);
        // rasters and dataset files are both JSON documents
        assert_eq!(FormatKind::from_path(Path::new("x.json")), None);
        assert_eq!(FormatKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_format_kind_from_str() {
        assert_eq!("Raster".parse::<FormatKind>(), Ok(FormatKind::Raster));
        assert_eq!("zarr".parse::<FormatKind>(), Ok(FormatKind::Archive));
        assert_eq!(
            "png".parse::<FormatKind>(),
            Err(UnknownFormat("png".to_string()))
        );
        assert_eq!(FormatKind::Dataset.to_string(), "dataset");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_approval_commands() {
        let received = PathBuf::from("out/t.received.tif");
        let approved = PathBuf::from("out/t.approved.tif");
        assert_eq!(
            RasterFormat.approval_command(&received, &approved),
            "mv -f \"out/t.received.tif\" \"out/t.approved.tif\""
        );
        assert_eq!(
            ArchiveFormat.approval_command(Path::new("r.zarr"), Path::new("a.zarr")),
            "rm -rf \"a.zarr\" && mv -f \"r.zarr\" \"a.zarr\""
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn test_directory_command_quotes_paths_with_spaces() {
        let command = directory_move_command(
            Path::new("/data/my tests/a.received.zarr"),
            Path::new("/data/my tests/a.approved.zarr"),
        );
        assert_eq!(
            command,
            "rm -rf \"/data/my tests/a.approved.zarr\" && \
             mv -f \"/data/my tests/a.received.zarr\" \"/data/my tests/a.approved.zarr\""
        );
    }

    #[test]
    fn test_placeholders_open_in_their_own_format() {
        let temp_dir = tempfile::tempdir().unwrap();
        for kind in [FormatKind::Raster, FormatKind::Dataset, FormatKind::Archive] {
            let format = kind.format();
            let path = temp_dir.path().join(format!("empty{}", format.extension()));
            format.create_empty(&path).unwrap();
            assert_eq!(path.is_dir(), format.is_directory());
            let opened = format.open(&path).unwrap();
            assert_eq!(opened.flat_tags.is_some(), kind == FormatKind::Raster);
        }
    }
}
