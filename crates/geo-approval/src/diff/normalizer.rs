//! Metadata normalization ahead of comparison.
//!
//! Volatile metadata is rewritten with the configured scrubbers so that
//! two artifacts produced at different times compare equal.

use log::debug;

use crate::dataset::{ArrayData, LabeledDataset};
use crate::scrub::{RecursiveScrubber, SequenceScrubber};

/// Scrub the attributes and textual coordinate labels of a dataset
///
/// `tags_scrubber` is applied to the global attributes, then to each data
/// variable's attributes, then to each coordinate's attributes.
/// `coords_scrubber` rewrites the values of text coordinates only; numeric
/// arrays are never touched.
pub fn normalize(
    dataset: &LabeledDataset,
    tags_scrubber: &RecursiveScrubber,
    coords_scrubber: &SequenceScrubber,
) -> LabeledDataset {
    let mut normalized = dataset.clone();

    normalized.attrs = tags_scrubber.scrub(&dataset.attrs);
    for variable in normalized.data_vars.values_mut() {
        variable.attrs = tags_scrubber.scrub(&variable.attrs);
    }
    for variable in normalized.coords.values_mut() {
        variable.attrs = tags_scrubber.scrub(&variable.attrs);
        if let ArrayData::Text(labels) = &mut variable.data {
            *labels = coords_scrubber.scrub(labels);
        }
    }

    debug!(
        "Normalized metadata of {} data variable(s) and {} coordinate(s)",
        normalized.data_vars.len(),
        normalized.coords.len()
    );
    normalized
}
