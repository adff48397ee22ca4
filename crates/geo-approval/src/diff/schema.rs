//! Schema definitions for comparison results.
//!
//! Defines the records a comparison produces: typed differences and
//! pixel difference statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a difference, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffKind {
    /// Metadata (tags or attributes)
    Tags,

    /// Summary statistics over differing pixels
    PixelStats,

    /// Itemized pixels
    Pixel,

    /// Raw detail of the approximate-equality check
    Dataset,
}

impl DiffKind {
    /// Label printed in front of a difference of this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            DiffKind::Tags => "Differences in meta data:\n",
            DiffKind::PixelStats => "Differences in pixel data:\n",
            DiffKind::Pixel => "Differences in pixels:\n",
            DiffKind::Dataset => "Differences in dataset:\n",
        }
    }
}

/// One difference between a received and an approved artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    /// Human-readable description
    pub description: String,

    /// What kind of difference this is
    pub kind: DiffKind,
}

impl Difference {
    pub fn new(description: impl Into<String>, kind: DiffKind) -> Self {
        Self {
            description: description.into(),
            kind,
        }
    }

    pub fn tags(description: impl Into<String>) -> Self {
        Self::new(description, DiffKind::Tags)
    }

    pub fn pixel_stats(description: impl Into<String>) -> Self {
        Self::new(description, DiffKind::PixelStats)
    }

    pub fn dataset(description: impl Into<String>) -> Self {
        Self::new(description, DiffKind::Dataset)
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.description)
    }
}

/// Statistics of the absolute pixel differences
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,

    /// Missing values in received minus missing values in approved
    pub nan_delta: i64,
}

impl Stats {
    /// No detectable difference, including in the count of missing values
    pub fn is_empty(&self) -> bool {
        self.min == 0.0 && self.max == 0.0 && self.nan_delta == 0
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min={}, max={}, mean={}, median={}, nan_delta={}",
            self.min, self.max, self.mean, self.median, self.nan_delta
        )
    }
}
