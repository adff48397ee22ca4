//! Directory-based chunked array archives.
//!
//! Layout, modelled on Zarr v2:
//!
//! ```text
//! archive.zarr/
//!   .zgroup            {"zarr_format": 2, "coordinates": [...]}
//!   .zattrs            global attributes
//!   <array>/.zarray    shape, chunks, dtype ("<f8" or "|O")
//!   <array>/.zattrs    {"_ARRAY_DIMENSIONS": [...], ...attributes}
//!   <array>/0.0        one file per chunk
//! ```
//!
//! Numeric chunks are raw little-endian f64 padded to the full chunk shape
//! and every chunk is stored; text arrays are a single JSON chunk.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::{read_json, remove_artifact, write_json};
use crate::dataset::{
    checked_element_count, element_count, ravel_index, unravel_index, ArrayData, AttrValue, Attrs, LabeledDataset,
    Variable,
};
use crate::io::dataset_file::empty_dataset;
use crate::utils::config::{ARCHIVE_FORMAT_VERSION, ARRAY_DIMENSIONS_ATTR};
use crate::utils::error::ArtifactError;

const GROUP_FILE: &str = ".zgroup";
const ATTRS_FILE: &str = ".zattrs";
const ARRAY_FILE: &str = ".zarray";
const NUMERIC_DTYPE: &str = "<f8";
const TEXT_DTYPE: &str = "|O";
const DEFAULT_CHUNK_SIZE: usize = 64;
const F64_BYTES: usize = std::mem::size_of::<f64>();

#[derive(Debug, Serialize, Deserialize)]
struct GroupMeta {
    zarr_format: u32,
    #[serde(default)]
    coordinates: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArrayMeta {
    zarr_format: u32,
    shape: Vec<usize>,
    chunks: Vec<usize>,
    dtype: String,
    #[serde(default)]
    fill_value: Option<f64>,
    #[serde(default = "default_order")]
    order: String,
}

fn default_order() -> String {
    "C".to_string()
}

/// Writes datasets as chunked archives
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    chunk_size: usize,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum chunk length along every axis
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Write `dataset` to `path`, replacing any previous archive there
    pub fn write(&self, path: impl AsRef<Path>, dataset: &LabeledDataset) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        info!("Writing archive to: {}", path.display());
        dataset.validate().map_err(|source| ArtifactError::Dataset {
            path: path.to_path_buf(),
            source,
        })?;

        if path.exists() {
            remove_artifact(path)?;
        }
        fs::create_dir_all(path).map_err(|e| ArtifactError::io(path, e))?;

        let group = GroupMeta {
            zarr_format: ARCHIVE_FORMAT_VERSION,
            coordinates: dataset.coords.keys().cloned().collect(),
        };
        write_json(&path.join(GROUP_FILE), &group)?;
        write_json(&path.join(ATTRS_FILE), &dataset.attrs)?;

        for (name, variable) in dataset.coords.iter().chain(dataset.data_vars.iter()) {
            self.write_array(&path.join(name), variable)?;
        }
        Ok(())
    }

    fn write_array(&self, dir: &Path, variable: &Variable) -> Result<(), ArtifactError> {
        fs::create_dir_all(dir).map_err(|e| ArtifactError::io(dir, e))?;

        let (dtype, chunks) = match &variable.data {
            ArrayData::Numeric(_) => (
                NUMERIC_DTYPE,
                variable
                    .shape
                    .iter()
                    .map(|&len| len.clamp(1, self.chunk_size))
                    .collect::<Vec<_>>(),
            ),
            ArrayData::Text(_) => (
                TEXT_DTYPE,
                variable.shape.iter().map(|&len| len.max(1)).collect(),
            ),
        };
        let meta = ArrayMeta {
            zarr_format: ARCHIVE_FORMAT_VERSION,
            shape: variable.shape.clone(),
            chunks: chunks.clone(),
            dtype: dtype.to_string(),
            fill_value: None,
            order: default_order(),
        };
        write_json(&dir.join(ARRAY_FILE), &meta)?;

        let mut attrs = variable.attrs.clone();
        attrs.insert(
            ARRAY_DIMENSIONS_ATTR.to_string(),
            AttrValue::List(variable.dims.iter().map(|d| AttrValue::from(d.as_str())).collect()),
        );
        write_json(&dir.join(ATTRS_FILE), &attrs)?;

        let grid = chunk_grid(&variable.shape, &chunks);
        match &variable.data {
            ArrayData::Numeric(values) => {
                for c in 0..element_count(&grid) {
                    let chunk_index = unravel_index(c, &grid);
                    let mut buffer = vec![f64::NAN; element_count(&chunks)];
                    for (cell, flat) in chunk_cells(&chunk_index, &chunks, &variable.shape) {
                        buffer[cell] = values[flat];
                    }
                    let bytes: Vec<u8> = buffer.iter().flat_map(|v| v.to_le_bytes()).collect();
                    let file = dir.join(chunk_key(&chunk_index));
                    fs::write(&file, bytes).map_err(|e| ArtifactError::io(&file, e))?;
                }
            }
            ArrayData::Text(values) => {
                if !values.is_empty() {
                    let file = dir.join(chunk_key(&vec![0; chunks.len()]));
                    write_json(&file, values)?;
                }
            }
        }
        Ok(())
    }
}

/// Read a chunked archive
///
/// # Errors
/// * `ArtifactError::Io` - If the directory or a metadata file is missing
/// * `ArtifactError::Json` - If metadata is not valid JSON
/// * `ArtifactError::Malformed` - If chunks or metadata are inconsistent
pub fn open_archive(path: impl AsRef<Path>) -> Result<LabeledDataset, ArtifactError> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Err(ArtifactError::malformed(path, "archive is not a directory"));
    }
    let group: GroupMeta = read_json(&path.join(GROUP_FILE))?;
    let attrs: Attrs = optional_attrs(&path.join(ATTRS_FILE))?;

    let mut entries: Vec<_> = fs::read_dir(path)
        .map_err(|e| ArtifactError::io(path, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ArtifactError::io(path, e))?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|p| p.join(ARRAY_FILE).is_file())
        .collect();
    entries.sort();

    let mut dataset = LabeledDataset::new().with_attrs(attrs);
    for dir in entries {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ArtifactError::malformed(&dir, "array without a name"))?;
        let variable = read_array(&dir)?;
        if group.coordinates.contains(&name) {
            dataset.coords.insert(name, variable);
        } else {
            dataset.data_vars.insert(name, variable);
        }
    }
    debug!(
        "Archive loaded: {} data variable(s), {} coordinate(s)",
        dataset.data_vars.len(),
        dataset.coords.len()
    );
    Ok(dataset)
}

fn optional_attrs(path: &Path) -> Result<Attrs, ArtifactError> {
    if path.is_file() {
        read_json(path)
    } else {
        Ok(Attrs::new())
    }
}

fn read_array(dir: &Path) -> Result<Variable, ArtifactError> {
    let meta: ArrayMeta = read_json(&dir.join(ARRAY_FILE))?;
    if meta.shape.len() != meta.chunks.len() || meta.chunks.iter().any(|&c| c == 0) {
        return Err(ArtifactError::malformed(
            dir,
            format!("chunks {:?} do not fit shape {:?}", meta.chunks, meta.shape),
        ));
    }

    let mut attrs = optional_attrs(&dir.join(ATTRS_FILE))?;
    let dims = match attrs.remove(ARRAY_DIMENSIONS_ATTR) {
        Some(AttrValue::List(items)) => items
            .iter()
            .map(|item| item.as_text().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ArtifactError::malformed(dir, "dimension names must be strings"))?,
        None if meta.shape.is_empty() => Vec::new(),
        _ => {
            return Err(ArtifactError::malformed(
                dir,
                format!("missing {}", ARRAY_DIMENSIONS_ATTR),
            ))
        }
    };

    let count = checked_element_count(&meta.shape).ok_or_else(|| {
        ArtifactError::malformed(dir, format!("shape {:?} overflows the element count", meta.shape))
    })?;
    let grid = chunk_grid(&meta.shape, &meta.chunks);
    let data = match meta.dtype.as_str() {
        NUMERIC_DTYPE => {
            let chunk_bytes = checked_element_count(&meta.chunks)
                .and_then(|len| len.checked_mul(F64_BYTES))
                .ok_or_else(|| {
                    ArtifactError::malformed(dir, format!("chunks {:?} are too large", meta.chunks))
                })?;
            // every chunk is stored, so the payload on disk bounds the allocation
            let needed = count.checked_mul(F64_BYTES).ok_or_else(|| {
                ArtifactError::malformed(dir, format!("shape {:?} is too large", meta.shape))
            })?;
            let stored = stored_chunk_bytes(dir)?;
            if stored < needed {
                return Err(ArtifactError::malformed(
                    dir,
                    format!(
                        "shape {:?} needs {} bytes of chunks, found {}",
                        meta.shape, needed, stored
                    ),
                ));
            }

            let mut values = vec![meta.fill_value.unwrap_or(f64::NAN); count];
            for c in 0..element_count(&grid) {
                let chunk_index = unravel_index(c, &grid);
                let file = dir.join(chunk_key(&chunk_index));
                if !file.is_file() {
                    return Err(ArtifactError::malformed(&file, "missing chunk"));
                }
                let bytes = fs::read(&file).map_err(|e| ArtifactError::io(&file, e))?;
                if bytes.len() != chunk_bytes {
                    return Err(ArtifactError::malformed(
                        &file,
                        format!("expected {} bytes, found {}", chunk_bytes, bytes.len()),
                    ));
                }
                let chunk: Vec<f64> = bytes
                    .chunks_exact(F64_BYTES)
                    .map(|raw| {
                        let mut buf = [0u8; F64_BYTES];
                        buf.copy_from_slice(raw);
                        f64::from_le_bytes(buf)
                    })
                    .collect();
                for (cell, flat) in chunk_cells(&chunk_index, &meta.chunks, &meta.shape) {
                    values[flat] = chunk[cell];
                }
            }
            ArrayData::Numeric(values)
        }
        TEXT_DTYPE => {
            let values: Vec<String> = if count == 0 {
                Vec::new()
            } else {
                read_json(&dir.join(chunk_key(&vec![0; meta.chunks.len()])))?
            };
            ArrayData::Text(values)
        }
        other => {
            return Err(ArtifactError::malformed(
                dir,
                format!("unsupported dtype '{}'", other),
            ))
        }
    };

    let variable = Variable {
        dims,
        shape: meta.shape,
        data,
        attrs,
    };
    variable.validate().map_err(|source| ArtifactError::Dataset {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(variable)
}

/// Write a dataset with the default chunking
pub fn write_archive(path: impl AsRef<Path>, dataset: &LabeledDataset) -> Result<(), ArtifactError> {
    ArchiveWriter::default().write(path, dataset)
}

/// Minimal valid archive: one `empty` variable over `(x, y)` holding a zero
pub fn create_empty_archive(path: impl AsRef<Path>) -> Result<(), ArtifactError> {
    write_archive(path, &empty_dataset())
}

// Number of chunks along each axis
fn chunk_grid(shape: &[usize], chunks: &[usize]) -> Vec<usize> {
    shape
        .iter()
        .zip(chunks)
        .map(|(&len, &chunk)| len.div_ceil(chunk))
        .collect()
}

// Total size of the chunk files in an array directory
fn stored_chunk_bytes(dir: &Path) -> Result<usize, ArtifactError> {
    let mut total: u64 = 0;
    for entry in fs::read_dir(dir).map_err(|e| ArtifactError::io(dir, e))? {
        let entry = entry.map_err(|e| ArtifactError::io(dir, e))?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let metadata = entry.metadata().map_err(|e| ArtifactError::io(entry.path(), e))?;
        if metadata.is_file() {
            total = total.saturating_add(metadata.len());
        }
    }
    Ok(usize::try_from(total).unwrap_or(usize::MAX))
}

fn chunk_key(index: &[usize]) -> String {
    if index.is_empty() {
        return "0".to_string();
    }
    index
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

// (offset inside the chunk, flat offset in the array) for every in-bounds cell
fn chunk_cells(chunk_index: &[usize], chunks: &[usize], shape: &[usize]) -> Vec<(usize, usize)> {
    (0..element_count(chunks))
        .filter_map(|cell| {
            let local = unravel_index(cell, chunks);
            let global: Vec<usize> = chunk_index
                .iter()
                .zip(&local)
                .zip(chunks)
                .map(|((c, l), size)| c * size + l)
                .collect();
            global
                .iter()
                .zip(shape)
                .all(|(g, len)| g < len)
                .then(|| (cell, ravel_index(&global, shape)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> LabeledDataset {
        let values: Vec<f64> = (0..15).map(|v| v as f64).collect();
        LabeledDataset::new()
            .with_attr("title", "archive")
            .with_coord("y", Variable::index_coord("y", vec![0.0, 1.0, 2.0]))
            .with_coord(
                "x",
                Variable::text(&["x"], &[5], vec!["a", "b", "c", "d", "e"]).unwrap(),
            )
            .with_coord("spatial_ref", Variable::scalar(0.0).with_attr("crs", "EPSG:4326"))
            .with_data_var(
                "var_name",
                Variable::numeric(&["y", "x"], &[3, 5], values)
                    .unwrap()
                    .with_attr("units", "m"),
            )
    }

    #[test]
    fn test_write_and_open_archive_with_partial_chunks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("cube.zarr");
        let dataset = sample_dataset();

        ArchiveWriter::new().with_chunk_size(2).write(&path, &dataset).unwrap();

        // 3x5 with 2x2 chunks -> 2x3 chunk files
        assert!(path.join("var_name/1.2").is_file());
        let loaded = open_archive(&path).unwrap();
        assert_eq!(loaded, dataset);
    }

    #[test]
    fn test_nan_survives_archive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nan.zarr");
        let dataset = LabeledDataset::new().with_data_var(
            "v",
            Variable::numeric(&["x"], &[2], vec![f64::NAN, 1.0]).unwrap(),
        );
        write_archive(&path, &dataset).unwrap();
        let loaded = open_archive(&path).unwrap();
        let values = loaded.data_vars["v"].numeric_values().unwrap();
        assert!(values[0].is_nan());
        assert_eq!(values[1], 1.0);
    }

    #[test]
    fn test_open_rejects_truncated_chunk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bad.zarr");
        write_archive(&path, &sample_dataset()).unwrap();
        fs::write(path.join("var_name/0.0"), [0u8; 3]).unwrap();
        assert!(matches!(
            open_archive(&path),
            Err(ArtifactError::Malformed { .. })
        ));
    }

    fn write_array_meta(archive: &Path, shape: &str, chunks: &str) {
        write_archive(archive, &LabeledDataset::new()).unwrap();
        let dir = archive.join("v");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(ARRAY_FILE),
            format!(r#"{{"zarr_format": 2, "shape": {}, "chunks": {}, "dtype": "<f8"}}"#, shape, chunks),
        )
        .unwrap();
        fs::write(dir.join(ATTRS_FILE), r#"{"_ARRAY_DIMENSIONS": ["y", "x"]}"#).unwrap();
        fs::write(dir.join("0.0"), 1.0f64.to_le_bytes()).unwrap();
    }

    #[test]
    fn test_open_rejects_overflowing_shape() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("huge.zarr");
        write_array_meta(&path, "[8589934592, 8589934592]", "[1, 1]");
        assert!(matches!(
            open_archive(&path),
            Err(ArtifactError::Malformed { .. })
        ));
    }

    #[test]
    fn test_open_rejects_overflowing_chunks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("chunky.zarr");
        write_array_meta(&path, "[1, 1]", "[8589934592, 8589934592]");
        assert!(matches!(
            open_archive(&path),
            Err(ArtifactError::Malformed { .. })
        ));
    }

    #[test]
    fn test_open_rejects_shape_larger_than_payload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("sparse.zarr");
        // fits in usize but would need terabytes of chunks
        write_array_meta(&path, "[1048576, 1048576]", "[1, 1]");
        assert!(matches!(
            open_archive(&path),
            Err(ArtifactError::Malformed { .. })
        ));
    }

    #[test]
    fn test_open_rejects_missing_chunk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("gap.zarr");
        let dataset = LabeledDataset::new().with_data_var(
            "v",
            Variable::numeric(&["x"], &[4], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
        );
        ArchiveWriter::new().with_chunk_size(2).write(&path, &dataset).unwrap();
        // keep the byte total, lose the chunk key
        fs::rename(path.join("v/1"), path.join("v/7")).unwrap();
        assert!(matches!(
            open_archive(&path),
            Err(ArtifactError::Malformed { .. })
        ));
    }

    #[test]
    fn test_open_plain_file_is_malformed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("marker.zarr");
        fs::write(&path, "").unwrap();
        assert!(open_archive(&path).is_err());
    }

    #[test]
    fn test_writer_replaces_previous_archive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("cube.zarr");
        write_archive(&path, &sample_dataset()).unwrap();
        create_empty_archive(&path).unwrap();

        let loaded = open_archive(&path).unwrap();
        assert_eq!(loaded, empty_dataset());
        assert!(!path.join("var_name").exists());
    }

    #[test]
    fn test_chunk_cells_clip_edge_chunks() {
        let cells = chunk_cells(&[1, 2], &[2, 2], &[3, 5]);
        // chunk covers rows 2..4 and cols 4..6, only (2, 4) is inside
        assert_eq!(cells, vec![(0, 14)]);
    }
}
