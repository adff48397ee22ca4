//! Artifact diff generation.
//!
//! This module compares a received artifact against its approved reference
//! and produces an ordered list of typed differences: metadata first, then
//! pixel statistics, then the raw detail of the numeric check.
//!
//! # Example
//! ```ignore
//! use geo_approval::diff::{render_diffs, Differ, Tolerance};
//! use geo_approval::format::RasterFormat;
//!
//! let differ = Differ::new(RasterFormat).with_tolerance(Tolerance::new(1e-6, 0.0)?);
//! let diffs = differ.diffs(received.as_ref(), approved.as_ref())?;
//! print!("{}", render_diffs(&diffs));
//! ```

mod allclose;
mod attrs;
mod engine;
mod normalizer;
mod output;
mod schema;
mod stats;
mod tolerance;

// Public API exports
pub use allclose::{assert_allclose, listing_sample, truncate_listing, Mismatch};
pub use attrs::{attrs_to_tags, diff_attrs, tags_to_attrs, unified_tags_diff};
pub use engine::{common_metadata_diffs, Differ};
pub use normalizer::normalize;
pub use output::{print_diffs, render_diffs};
pub use schema::{DiffKind, Difference, Stats};
pub use stats::{diff_stats, variable_stats};
pub use tolerance::Tolerance;

// Error type
use thiserror::Error;

use crate::utils::error::ArtifactError;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("Failed to open artifact: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Invalid tolerance rel={rel}, abs={abs}: both must be finite and non-negative")]
    InvalidTolerance { rel: f64, abs: f64 },

    #[error("Failed to write report: {0}")]
    Report(#[from] std::io::Error),
}

#[cfg(test)]
mod tests;
