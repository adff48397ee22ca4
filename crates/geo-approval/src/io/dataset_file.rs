//! Single-file multi-variable datasets.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{read_json, write_json};
use crate::dataset::{ArrayData, Attrs, LabeledDataset, Variable};
use crate::utils::config::{DATASET_FORMAT_TAG, EMPTY_VARIABLE};
use crate::utils::error::ArtifactError;

#[derive(Debug, Serialize, Deserialize)]
struct DatasetDocument {
    format: String,
    #[serde(flatten)]
    dataset: LabeledDataset,
}

/// Read a dataset file
///
/// # Errors
/// * `ArtifactError::Io` / `ArtifactError::Json` - If the file cannot be read or parsed
/// * `ArtifactError::Malformed` - If the format marker is wrong
/// * `ArtifactError::Dataset` - If a variable's shape and values disagree
pub fn open_dataset_file(path: impl AsRef<Path>) -> Result<LabeledDataset, ArtifactError> {
    let path = path.as_ref();
    let document: DatasetDocument = read_json(path)?;
    if document.format != DATASET_FORMAT_TAG {
        return Err(ArtifactError::malformed(
            path,
            format!(
                "expected format '{}', found '{}'",
                DATASET_FORMAT_TAG, document.format
            ),
        ));
    }
    document
        .dataset
        .validate()
        .map_err(|source| ArtifactError::Dataset {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(
        "Dataset loaded: {} data variable(s), {} coordinate(s)",
        document.dataset.data_vars.len(),
        document.dataset.coords.len()
    );
    Ok(document.dataset)
}

/// Write a dataset file, creating parent directories
pub fn write_dataset_file(
    path: impl AsRef<Path>,
    dataset: &LabeledDataset,
) -> Result<(), ArtifactError> {
    let path = path.as_ref();
    info!("Writing dataset to: {}", path.display());
    dataset.validate().map_err(|source| ArtifactError::Dataset {
        path: path.to_path_buf(),
        source,
    })?;
    write_json(
        path,
        &DatasetDocument {
            format: DATASET_FORMAT_TAG.to_string(),
            dataset: dataset.clone(),
        },
    )
}

/// The placeholder dataset: one `empty` variable over `(x, y)` holding a zero
pub fn empty_dataset() -> LabeledDataset {
    LabeledDataset::new().with_data_var(
        EMPTY_VARIABLE,
        Variable {
            dims: vec!["x".to_string(), "y".to_string()],
            shape: vec![1, 1],
            data: ArrayData::Numeric(vec![0.0]),
            attrs: Attrs::new(),
        },
    )
}

/// Minimal valid dataset file
pub fn create_empty_dataset_file(path: impl AsRef<Path>) -> Result<(), ArtifactError> {
    write_dataset_file(path, &empty_dataset())
}
