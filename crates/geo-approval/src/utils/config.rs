//! Constants shared across the crate.

/// Default relative tolerance for floating point comparison
pub const DEFAULT_REL_TOLERANCE: f64 = 1e-9;

/// Default absolute tolerance for floating point comparison
pub const DEFAULT_ABS_TOLERANCE: f64 = 0.0;

// Element listings longer than this are cut down to head, middle and tail samples
pub const MAX_LISTED_ELEMENTS: usize = 10;
pub const LISTING_SAMPLE_SIZE: usize = 3;
pub const LISTING_ELLIPSIS: &str = "...";

/// Name of the data variable a single-file raster is exposed as
pub const RASTER_VARIABLE: &str = "data";

/// Name of the variable written into empty dataset placeholders
pub const EMPTY_VARIABLE: &str = "empty";

/// Default config file looked up by the CLI
pub const CONFIG_FILE_NAME: &str = "approval-geo.toml";

/// Environment variable overriding the configured data root
pub const DATA_ROOT_ENV: &str = "APPROVAL_GEO_DATA_ROOT";

/// Marker written into raster files so foreign JSON is rejected early
pub const RASTER_FORMAT_TAG: &str = "geo-raster";

/// Marker written into single-file datasets
pub const DATASET_FORMAT_TAG: &str = "geo-dataset";

/// Chunked archive layout version written into `.zgroup`
pub const ARCHIVE_FORMAT_VERSION: u32 = 2;

// Dimension attribute carried by every archived array (same key xarray uses)
pub const ARRAY_DIMENSIONS_ATTR: &str = "_ARRAY_DIMENSIONS";
