//! Single-file raster artifacts.
//!
//! A raster is a stack of bands on a regular grid plus a flat string-keyed
//! tag dictionary. On disk it is one JSON document; values are band-major
//! and `null` marks a missing pixel.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::{read_json, write_json};
use crate::dataset::{
    checked_element_count, nan_as_null, ArrayData, AttrValue, Attrs, LabeledDataset, Variable,
};
use crate::utils::config::{RASTER_FORMAT_TAG, RASTER_VARIABLE};
use crate::utils::error::ArtifactError;

/// A georeferenced raster with flat tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRaster {
    /// Format marker, always `geo-raster`
    pub format: String,

    pub bands: usize,
    pub height: usize,
    pub width: usize,

    /// Affine transform in GDAL order: x origin, pixel width, row rotation,
    /// y origin, column rotation, pixel height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<[f64; 6]>,

    /// Coordinate reference system, e.g. `EPSG:4326`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,

    /// Value marking missing pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodata: Option<f64>,

    /// Flat string tags
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Attributes of the pixel array (scale factors, units, ...)
    #[serde(default)]
    pub band_attrs: Attrs,

    #[serde(with = "nan_as_null")]
    pub values: Vec<f64>,
}

impl GeoRaster {
    /// Single-band raster from rows of pixels
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        Self::from_bands(vec![rows])
    }

    /// Multi-band raster; every band must have the same grid
    pub fn from_bands(bands: Vec<Vec<Vec<f64>>>) -> Self {
        let height = bands.first().map(Vec::len).unwrap_or(0);
        let width = bands
            .first()
            .and_then(|band| band.first())
            .map(Vec::len)
            .unwrap_or(0);
        let count = bands.len();
        let values = bands.into_iter().flatten().flatten().collect();
        GeoRaster {
            format: RASTER_FORMAT_TAG.to_string(),
            bands: count,
            height,
            width,
            transform: None,
            crs: None,
            nodata: None,
            tags: BTreeMap::new(),
            band_attrs: Attrs::new(),
            values,
        }
    }

    /// Raster with every pixel set to `value`
    pub fn filled(bands: usize, height: usize, width: usize, value: f64) -> Self {
        GeoRaster {
            bands,
            height,
            width,
            values: vec![value; bands * height * width],
            ..Self::from_rows(Vec::new())
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_transform(mut self, transform: [f64; 6]) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Check the header agrees with the pixel payload
    pub fn validate(&self, path: &Path) -> Result<(), ArtifactError> {
        if self.format != RASTER_FORMAT_TAG {
            return Err(ArtifactError::malformed(
                path,
                format!("expected format '{}', found '{}'", RASTER_FORMAT_TAG, self.format),
            ));
        }
        let expected = checked_element_count(&[self.bands, self.height, self.width])
            .ok_or_else(|| {
                ArtifactError::malformed(
                    path,
                    format!(
                        "{} bands of {}x{} overflow the pixel count",
                        self.bands, self.height, self.width
                    ),
                )
            })?;
        if self.values.len() != expected {
            return Err(ArtifactError::malformed(
                path,
                format!(
                    "{} bands of {}x{} need {} values, found {}",
                    self.bands,
                    self.height,
                    self.width,
                    expected,
                    self.values.len()
                ),
            ));
        }
        Ok(())
    }

    /// Expose the raster as a labeled dataset
    ///
    /// One data variable over `(band, y, x)`, coordinates `band` (1-based),
    /// `y` and `x` (pixel centres when a transform is known, else indices) and
    /// a scalar `spatial_ref` carrying the georeferencing.
    pub fn to_dataset(&self) -> LabeledDataset {
        let mut data_attrs = self.band_attrs.clone();
        if let Some(nodata) = self.nodata {
            data_attrs.insert("_FillValue".to_string(), AttrValue::Float(nodata));
        }
        let data = Variable {
            dims: vec!["band".to_string(), "y".to_string(), "x".to_string()],
            shape: vec![self.bands, self.height, self.width],
            data: ArrayData::Numeric(self.values.clone()),
            attrs: data_attrs,
        };

        let bands = (1..=self.bands).map(|b| b as f64).collect();
        let (xs, ys) = match self.transform {
            Some([x0, dx, _, y0, _, dy]) => (
                (0..self.width).map(|i| x0 + (i as f64 + 0.5) * dx).collect(),
                (0..self.height).map(|j| y0 + (j as f64 + 0.5) * dy).collect(),
            ),
            None => (
                (0..self.width).map(|i| i as f64).collect(),
                (0..self.height).map(|j| j as f64).collect(),
            ),
        };

        let mut spatial_ref = Variable::scalar(0.0);
        if let Some(crs) = &self.crs {
            spatial_ref = spatial_ref.with_attr("crs", crs.as_str());
        }
        if let Some(transform) = self.transform {
            let text = transform
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            spatial_ref = spatial_ref.with_attr("GeoTransform", text);
        }

        LabeledDataset::new()
            .with_coord("band", Variable::index_coord("band", bands))
            .with_coord("y", Variable::index_coord("y", ys))
            .with_coord("x", Variable::index_coord("x", xs))
            .with_coord("spatial_ref", spatial_ref)
            .with_data_var(RASTER_VARIABLE, data)
    }

    /// Build a raster from a dataset holding one 2-D or 3-D numeric variable
    ///
    /// Dataset attributes become tags; the grid origin and pixel size are
    /// recovered from regular `x`/`y` coordinates when present.
    pub fn from_dataset(dataset: &LabeledDataset, path: &Path) -> Result<Self, ArtifactError> {
        let (name, variable) = dataset
            .data_vars
            .get_key_value(RASTER_VARIABLE)
            .or_else(|| dataset.data_vars.iter().next())
            .ok_or_else(|| ArtifactError::malformed(path, "dataset has no data variable"))?;
        let values = variable.numeric_values().ok_or_else(|| {
            ArtifactError::malformed(path, format!("variable '{}' is not numeric", name))
        })?;
        let (bands, height, width) = match variable.shape.as_slice() {
            [h, w] => (1, *h, *w),
            [b, h, w] => (*b, *h, *w),
            other => {
                return Err(ArtifactError::malformed(
                    path,
                    format!("rasters need 2 or 3 dimensions, found shape {:?}", other),
                ))
            }
        };

        let tags = dataset
            .attrs
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();
        let crs = dataset
            .coords
            .get("spatial_ref")
            .and_then(|c| c.attrs.get("crs"))
            .and_then(AttrValue::as_text)
            .map(str::to_string);
        let transform = match (axis_origin(dataset, "x"), axis_origin(dataset, "y")) {
            (Some((x0, dx)), Some((y0, dy))) => Some([x0, dx, 0.0, y0, 0.0, dy]),
            _ => None,
        };
        let mut band_attrs = variable.attrs.clone();
        let nodata = match band_attrs.remove("_FillValue") {
            Some(AttrValue::Float(v)) => Some(v),
            Some(AttrValue::Int(v)) => Some(v as f64),
            _ => None,
        };

        Ok(GeoRaster {
            format: RASTER_FORMAT_TAG.to_string(),
            bands,
            height,
            width,
            transform,
            crs,
            nodata,
            tags,
            band_attrs,
            values: values.to_vec(),
        })
    }
}

// Origin edge and step of a regular 1-D coordinate
fn axis_origin(dataset: &LabeledDataset, dim: &str) -> Option<(f64, f64)> {
    let values = dataset.coords.get(dim)?.numeric_values()?;
    let first = *values.first()?;
    let step = match values.get(1) {
        Some(second) => second - first,
        None => 1.0,
    };
    Some((first - step / 2.0, step))
}

/// Read a raster file
///
/// # Errors
/// * `ArtifactError::Io` - If the file cannot be read
/// * `ArtifactError::Json` - If the document is not valid JSON
/// * `ArtifactError::Malformed` - If the header and pixels disagree
pub fn open_raster(path: impl AsRef<Path>) -> Result<GeoRaster, ArtifactError> {
    let path = path.as_ref();
    let raster: GeoRaster = read_json(path)?;
    raster.validate(path)?;
    debug!(
        "Raster loaded: {} band(s) of {}x{}, {} tag(s)",
        raster.bands,
        raster.height,
        raster.width,
        raster.tags.len()
    );
    Ok(raster)
}

/// Write a raster file, creating parent directories
pub fn write_raster(path: impl AsRef<Path>, raster: &GeoRaster) -> Result<(), ArtifactError> {
    let path = path.as_ref();
    info!("Writing raster to: {}", path.display());
    raster.validate(path)?;
    write_json(path, raster)
}

/// Minimal valid raster: one band holding a single zero pixel
pub fn create_empty_raster(path: impl AsRef<Path>) -> Result<(), ArtifactError> {
    write_raster(path, &GeoRaster::from_rows(vec![vec![0.0]]))
}
