//! Error types for datasets and artifact I/O.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in commands and main.rs.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building an in-memory dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("{dims} dimension names given for a {rank}-dimensional shape")]
    RankMismatch { dims: usize, rank: usize },

    #[error("shape {shape:?} needs {expected} values but {actual} were given")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("shape {shape:?} holds more elements than fit in memory")]
    TooLarge { shape: Vec<usize> },

    #[error("Invalid variable '{name}': {source}")]
    InvalidVariable {
        name: String,
        #[source]
        source: Box<DatasetError>,
    },

    #[error("Name used for both a coordinate and a data variable: {0}")]
    DuplicateName(String),
}

/// Errors raised by the artifact openers and writers
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed artifact {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Invalid dataset in {path}: {source}")]
    Dataset {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArtifactError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ArtifactError::Json {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ArtifactError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
