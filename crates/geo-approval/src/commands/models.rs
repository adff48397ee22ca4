use std::path::PathBuf;

use crate::format::FormatKind;

/// Settings shared by every command
///
/// **Public** - filled from the global CLI flags
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Config file; `approval-geo.toml` in the working directory when unset
    pub config: Option<PathBuf>,

    /// Data root override (CLI flag or environment)
    pub data_root: Option<PathBuf>,
}

/// Arguments for the compare command
#[derive(Debug, Clone)]
pub struct CompareArgs {
    /// Received artifact
    pub received: PathBuf,

    /// Approved reference artifact
    pub approved: PathBuf,

    /// Artifact format; guessed from the extensions when unset
    pub format: Option<FormatKind>,

    /// Print the difference report when the artifacts differ
    pub report: bool,

    pub settings: Settings,
}

/// Arguments for the report command
#[derive(Debug, Clone)]
pub struct ReportArgs {
    /// Received artifact
    pub received: PathBuf,

    /// Approved reference artifact; a placeholder is created when missing
    pub approved: PathBuf,

    /// Artifact format; guessed from the extensions when unset
    pub format: Option<FormatKind>,

    pub settings: Settings,
}

/// Arguments for the placeholder command
#[derive(Debug, Clone)]
pub struct PlaceholderArgs {
    /// Where to write the empty artifact
    pub path: PathBuf,

    /// Artifact format; guessed from the extension when unset
    pub format: Option<FormatKind>,

    /// Replace an existing artifact
    pub force: bool,
}

/// Arguments for the approve command
#[derive(Debug, Clone)]
pub struct ApproveArgs {
    /// Received artifact to promote
    pub received: PathBuf,

    /// Approved artifact to replace
    pub approved: PathBuf,
}
