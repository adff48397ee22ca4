//! `approval-geo.toml` configuration.
//!
//! ```toml
//! data_root = "tests/data"
//! input = "input"
//! approved = "approved"
//! scrubbers = ["dates", "guids"]
//! coord_scrubbers = ["dates"]
//!
//! [tolerance]
//! rel = 1e-6
//! abs = 0.0
//! ```

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::diff::{DiffError, Tolerance};
use crate::options::GeoOptions;
use crate::scrub::{
    preset, ChainScrubber, RecursiveScrubber, ScrubError, Scrubber, SequenceScrubber,
};
use crate::utils::config::DATA_ROOT_ENV;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Scrub(#[from] ScrubError),

    #[error(transparent)]
    Tolerance(DiffError),
}

/// Settings shared by every verification of a test suite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Directory the `input` and `approved` paths are relative to
    pub data_root: Option<PathBuf>,

    /// Input data directory
    pub input: Option<PathBuf>,

    /// Directory holding approved artifacts
    pub approved: Option<PathBuf>,

    pub tolerance: Option<Tolerance>,

    /// Scrubber presets applied to attributes, in order
    pub scrubbers: Vec<String>,

    /// Scrubber presets applied to text coordinate values, in order
    pub coord_scrubbers: Vec<String>,
}

impl GeoConfig {
    /// Replace the data root when an override is given
    pub fn with_data_root(mut self, data_root: Option<PathBuf>) -> Self {
        if data_root.is_some() {
            self.data_root = data_root;
        }
        self
    }

    /// Apply `APPROVAL_GEO_DATA_ROOT` when it is set
    pub fn with_env_data_root(self) -> Self {
        let from_env = std::env::var_os(DATA_ROOT_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        self.with_data_root(from_env)
    }

    pub fn input_directory(&self) -> Option<PathBuf> {
        self.input.as_deref().map(|p| self.resolve(p))
    }

    pub fn approved_directory(&self) -> Option<PathBuf> {
        self.approved.as_deref().map(|p| self.resolve(p))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.data_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Build verification options from this config
    ///
    /// # Errors
    /// * `ConfigError::Scrub` - If a scrubber preset is unknown
    /// * `ConfigError::Tolerance` - If the tolerance is negative or not finite
    pub fn to_options(&self) -> Result<GeoOptions, ConfigError> {
        let mut options = GeoOptions::new();

        if let Some(tolerance) = self.tolerance {
            tolerance.validate().map_err(ConfigError::Tolerance)?;
            options = options.with_tolerance(tolerance);
        }
        if !self.scrubbers.is_empty() {
            let chain = chain_presets(&self.scrubbers)?;
            options = options.with_tags_scrubber(RecursiveScrubber::from_shared(chain));
        }
        if !self.coord_scrubbers.is_empty() {
            let chain = chain_presets(&self.coord_scrubbers)?;
            options = options.with_coords_scrubber(SequenceScrubber::from_shared(chain));
        }
        if let Some(dir) = self.approved_directory() {
            options = options.with_approved_directory(dir);
        }

        Ok(options)
    }
}

fn chain_presets(names: &[String]) -> Result<Arc<dyn Scrubber>, ScrubError> {
    let mut chain = ChainScrubber::new();
    for name in names {
        chain = chain.then_shared(preset(name)?);
    }
    Ok(Arc::new(chain))
}

/// Load a config file
///
/// # Errors
/// * `ConfigError::Io` - If the file cannot be read
/// * `ConfigError::Parse` - If the file is not valid TOML for `GeoConfig`
pub fn load_config(path: impl AsRef<Path>) -> Result<GeoConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: GeoConfig = toml::from_str(&contents)?;
    debug!("Loaded config from {}: {:?}", path.display(), config);
    Ok(config)
}
