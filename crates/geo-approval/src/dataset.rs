//! In-memory labeled dataset model.
//!
//! Every artifact format is opened into a [`LabeledDataset`]: named data
//! variables and coordinates over named dimensions, with nested key/value
//! attributes on the dataset, on each data variable and on each coordinate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::utils::error::DatasetError;

/// Attribute mapping, ordered by key so renderings are deterministic
pub type Attrs = BTreeMap<String, AttrValue>;

/// A single attribute value: scalar leaf or nested container
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<AttrValue>),
    /// Fixed-size sequence; stored on disk as a plain list
    #[serde(skip_deserializing)]
    Tuple(Vec<AttrValue>),
    Map(Attrs),
}

impl AttrValue {
    /// Returns the text if this is a string leaf
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether this value is a mapping or sequence
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            AttrValue::List(_) | AttrValue::Tuple(_) | AttrValue::Map(_)
        )
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(text) => write!(f, "{:?}", text),
            other => write!(f, "{}", other),
        }
    }
}

// NaN attributes (fill values mostly) compare equal to each other
impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Null, AttrValue::Null) => true,
            (AttrValue::Bool(a), AttrValue::Bool(b)) => a == b,
            (AttrValue::Int(a), AttrValue::Int(b)) => a == b,
            (AttrValue::Float(a), AttrValue::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (AttrValue::Text(a), AttrValue::Text(b)) => a == b,
            (AttrValue::List(a), AttrValue::List(b)) => a == b,
            (AttrValue::Tuple(a), AttrValue::Tuple(b)) => a == b,
            (AttrValue::Map(a), AttrValue::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => write!(f, "null"),
            AttrValue::Bool(value) => write!(f, "{}", value),
            AttrValue::Int(value) => write!(f, "{}", value),
            AttrValue::Float(value) => write!(f, "{}", value),
            AttrValue::Text(text) => write!(f, "{}", text),
            AttrValue::List(items) | AttrValue::Tuple(items) => {
                let (open, close) = if matches!(self, AttrValue::List(_)) {
                    ("[", "]")
                } else {
                    ("(", ")")
                };
                write!(f, "{}", open)?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                write!(f, "{}", close)
            }
            AttrValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: ", key)?;
                    value.fmt_nested(f)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<Vec<AttrValue>> for AttrValue {
    fn from(items: Vec<AttrValue>) -> Self {
        AttrValue::List(items)
    }
}

impl From<Attrs> for AttrValue {
    fn from(map: Attrs) -> Self {
        AttrValue::Map(map)
    }
}

/// Array payload of a variable, flattened in row-major order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ArrayData {
    /// Numeric values; NaN marks a missing value
    Numeric(#[serde(with = "nan_as_null")] Vec<f64>),
    Text(Vec<String>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Numeric(values) => values.len(),
            ArrayData::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render one element for reports
    pub fn element_label(&self, index: usize) -> String {
        match self {
            ArrayData::Numeric(values) => values
                .get(index)
                .map(|v| v.to_string())
                .unwrap_or_default(),
            ArrayData::Text(values) => values
                .get(index)
                .map(|v| format!("{:?}", v))
                .unwrap_or_default(),
        }
    }
}

/// A data variable or coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Dimension names, one per axis
    pub dims: Vec<String>,

    /// Axis lengths
    pub shape: Vec<usize>,

    /// Flattened values
    pub data: ArrayData,

    /// Per-variable attributes
    #[serde(default)]
    pub attrs: Attrs,
}

impl Variable {
    /// Build a validated variable
    pub fn new(dims: &[&str], shape: &[usize], data: ArrayData) -> Result<Self, DatasetError> {
        let variable = Variable {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            data,
            attrs: Attrs::new(),
        };
        variable.validate()?;
        Ok(variable)
    }

    pub fn numeric(dims: &[&str], shape: &[usize], values: Vec<f64>) -> Result<Self, DatasetError> {
        Self::new(dims, shape, ArrayData::Numeric(values))
    }

    pub fn text<S: Into<String>>(
        dims: &[&str],
        shape: &[usize],
        values: Vec<S>,
    ) -> Result<Self, DatasetError> {
        Self::new(
            dims,
            shape,
            ArrayData::Text(values.into_iter().map(Into::into).collect()),
        )
    }

    /// 1-D numeric coordinate over a dimension of the same name
    pub fn index_coord(dim: &str, values: Vec<f64>) -> Self {
        Variable {
            dims: vec![dim.to_string()],
            shape: vec![values.len()],
            data: ArrayData::Numeric(values),
            attrs: Attrs::new(),
        }
    }

    /// 0-D numeric variable
    pub fn scalar(value: f64) -> Self {
        Variable {
            dims: Vec::new(),
            shape: Vec::new(),
            data: ArrayData::Numeric(vec![value]),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    /// Check dims, shape and element count agree
    pub fn validate(&self) -> Result<(), DatasetError> {
        if self.dims.len() != self.shape.len() {
            return Err(DatasetError::RankMismatch {
                dims: self.dims.len(),
                rank: self.shape.len(),
            });
        }
        let expected = checked_element_count(&self.shape).ok_or_else(|| DatasetError::TooLarge {
            shape: self.shape.clone(),
        })?;
        if expected != self.data.len() {
            return Err(DatasetError::ShapeMismatch {
                shape: self.shape.clone(),
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn numeric_values(&self) -> Option<&[f64]> {
        match &self.data {
            ArrayData::Numeric(values) => Some(values),
            ArrayData::Text(_) => None,
        }
    }

    pub fn text_values(&self) -> Option<&[String]> {
        match &self.data {
            ArrayData::Text(values) => Some(values),
            ArrayData::Numeric(_) => None,
        }
    }

    /// Number of missing (NaN) values; always zero for text
    pub fn nan_count(&self) -> usize {
        self.numeric_values()
            .map(|values| values.iter().filter(|v| v.is_nan()).count())
            .unwrap_or(0)
    }
}

/// Named data variables and coordinates with three levels of attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledDataset {
    /// Dataset-global attributes
    #[serde(default)]
    pub attrs: Attrs,

    /// Coordinate arrays by name
    #[serde(default)]
    pub coords: BTreeMap<String, Variable>,

    /// Data variables by name
    #[serde(default)]
    pub data_vars: BTreeMap<String, Variable>,
}

impl LabeledDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_data_var(mut self, name: impl Into<String>, variable: Variable) -> Self {
        self.data_vars.insert(name.into(), variable);
        self
    }

    pub fn with_coord(mut self, name: impl Into<String>, variable: Variable) -> Self {
        self.coords.insert(name.into(), variable);
        self
    }

    /// Validate every variable and the uniqueness of names across sections
    pub fn validate(&self) -> Result<(), DatasetError> {
        for (name, variable) in self.coords.iter().chain(self.data_vars.iter()) {
            variable
                .validate()
                .map_err(|source| DatasetError::InvalidVariable {
                    name: name.clone(),
                    source: Box::new(source),
                })?;
        }
        if let Some(name) = self.coords.keys().find(|n| self.data_vars.contains_key(*n)) {
            return Err(DatasetError::DuplicateName(name.clone()));
        }
        Ok(())
    }

    /// Data variable names present in both datasets, sorted
    pub fn common_data_vars(&self, other: &LabeledDataset) -> Vec<String> {
        common_keys(&self.data_vars, &other.data_vars)
    }

    /// Coordinate names present in both datasets, sorted
    pub fn common_coords(&self, other: &LabeledDataset) -> Vec<String> {
        common_keys(&self.coords, &other.coords)
    }

    /// Render a position as `dim=label, ...`
    ///
    /// A dimension is labeled through its 1-D dimension coordinate when the
    /// dataset has one of matching length, otherwise by the raw index.
    pub fn position_label(&self, variable: &Variable, index: &[usize]) -> String {
        variable
            .dims
            .iter()
            .zip(index)
            .enumerate()
            .map(|(axis, (dim, &i))| {
                let label = self
                    .coords
                    .get(dim)
                    .filter(|c| c.dims.len() == 1 && &c.dims[0] == dim)
                    .filter(|c| c.len() == variable.shape[axis])
                    .map(|c| match &c.data {
                        ArrayData::Numeric(values) => values[i].to_string(),
                        ArrayData::Text(values) => values[i].clone(),
                    })
                    .unwrap_or_else(|| i.to_string());
                format!("{}={}", dim, label)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn common_keys<V>(a: &BTreeMap<String, V>, b: &BTreeMap<String, V>) -> Vec<String> {
    a.keys().filter(|k| b.contains_key(*k)).cloned().collect()
}

/// Product of the axis lengths; 1 for a scalar
///
/// Only for shapes already checked with [`checked_element_count`].
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Product of the axis lengths, `None` when it overflows `usize`
pub fn checked_element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |count, &len| count.checked_mul(len))
}

/// Convert a flat row-major offset into a multi-index
pub fn unravel_index(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for axis in (0..shape.len()).rev() {
        let len = shape[axis].max(1);
        index[axis] = flat % len;
        flat /= len;
    }
    index
}

/// Convert a multi-index into a flat row-major offset
pub fn ravel_index(index: &[usize], shape: &[usize]) -> usize {
    index
        .iter()
        .zip(shape)
        .fold(0, |offset, (&i, &len)| offset * len + i)
}

/// Serialize NaN as JSON `null` and read it back
pub(crate) mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<Option<f64>> = values
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let encoded = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(encoded
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }
}
