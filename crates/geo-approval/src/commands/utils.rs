//! Helpers shared by the commands.

use anyhow::{bail, Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use super::models::Settings;
use crate::config::{load_config, GeoConfig};
use crate::format::FormatKind;
use crate::options::GeoOptions;
use crate::utils::config::CONFIG_FILE_NAME;

/// Pick the artifact format: the explicit choice, else the first path with
/// a known extension
pub fn resolve_format(explicit: Option<FormatKind>, paths: &[&Path]) -> Result<FormatKind> {
    if let Some(kind) = explicit {
        return Ok(kind);
    }
    match paths.iter().find_map(|p| FormatKind::from_path(p)) {
        Some(kind) => {
            debug!("Detected {} artifacts", kind);
            Ok(kind)
        }
        None => bail!(
            "Cannot tell the artifact format of {}; pass --format",
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Build verification options from the config file and overrides
///
/// An explicit config path must exist; the default file is optional.
pub fn load_options(settings: &Settings) -> Result<GeoOptions> {
    let config = match &settings.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let default = PathBuf::from(CONFIG_FILE_NAME);
            if default.is_file() {
                load_config(&default).context("Failed to load default config")?
            } else {
                GeoConfig::default()
            }
        }
    };

    let config = config
        .with_env_data_root()
        .with_data_root(settings.data_root.clone());
    config.to_options().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_format() {
        assert_eq!(
            resolve_format(Some(FormatKind::Archive), &[Path::new("a.tif")]).unwrap(),
            FormatKind::Archive
        );
        assert_eq!(
            resolve_format(None, &[Path::new("a.bin"), Path::new("b.nc")]).unwrap(),
            FormatKind::Dataset
        );
        assert!(resolve_format(None, &[Path::new("a.bin")]).is_err());
    }

    #[test]
    fn test_load_options_from_explicit_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(&path, "approved = \"/ref\"\n[tolerance]\nrel = 0.5\nabs = 0.0\n").unwrap();

        let options = load_options(&Settings {
            config: Some(path),
            data_root: None,
        })
        .unwrap();
        assert_eq!(options.tolerance().rel, 0.5);
        assert_eq!(options.approved_directory(), Some(Path::new("/ref")));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let settings = Settings {
            config: Some(PathBuf::from("/no/such/approval-geo.toml")),
            data_root: None,
        };
        assert!(load_options(&settings).is_err());
    }
}
