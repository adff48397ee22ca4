//! Geo Approval library
//!
//! Approval testing for geospatial rasters, multi-variable datasets and
//! chunked array archives: a received artifact is compared with its approved
//! reference under a numeric tolerance and metadata scrubbing, and a bounded
//! difference report is printed when they disagree.

pub mod commands;
pub mod comparator;
pub mod config;
pub mod dataset;
pub mod diff;
pub mod format;
pub mod io;
pub mod options;
pub mod reporter;
pub mod scrub;
pub mod utils;
pub mod verify;

pub use comparator::Comparator;
pub use config::{load_config, ConfigError, GeoConfig};
pub use dataset::{AttrValue, Attrs, LabeledDataset, Variable};
pub use diff::{DiffError, Differ, Difference, Tolerance};
pub use format::{ArchiveFormat, ArtifactFormat, DatasetFileFormat, FormatKind, RasterFormat};
pub use options::GeoOptions;
pub use reporter::Reporter;
pub use verify::{
    approve, verify_artifact, verify_geo_archive, verify_geo_dataset, verify_geo_raster,
    verify_raster_as_geo_raster, verify_rows, Namer, VerifyError,
};
