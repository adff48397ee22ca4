//! Lifting a string scrubber over nested attributes and coordinate labels.

use std::fmt;
use std::sync::Arc;

use super::{IdentityScrubber, ScrubContext, Scrubber};
use crate::dataset::{AttrValue, Attrs};

/// Scrub every key and every string leaf of a mapping
///
/// Containers keep their kind (list stays list, tuple stays tuple); numbers,
/// booleans and nulls pass through unchanged. The top level is always a
/// mapping, which is the only shape attributes come in.
pub fn scrub_recursive(attrs: &Attrs, scrubber: &dyn Scrubber, ctx: &mut ScrubContext) -> Attrs {
    attrs
        .iter()
        .map(|(key, value)| {
            let key = scrubber.scrub(key, ctx);
            let value = scrub_element(value, scrubber, ctx);
            (key, value)
        })
        .collect()
}

/// Scrub a single attribute value of any shape
pub fn scrub_element(value: &AttrValue, scrubber: &dyn Scrubber, ctx: &mut ScrubContext) -> AttrValue {
    match value {
        AttrValue::Text(text) => AttrValue::Text(scrubber.scrub(text, ctx)),
        AttrValue::List(items) => AttrValue::List(
            items
                .iter()
                .map(|item| scrub_element(item, scrubber, ctx))
                .collect(),
        ),
        AttrValue::Tuple(items) => AttrValue::Tuple(
            items
                .iter()
                .map(|item| scrub_element(item, scrubber, ctx))
                .collect(),
        ),
        AttrValue::Map(map) => AttrValue::Map(scrub_recursive(map, scrubber, ctx)),
        leaf => leaf.clone(),
    }
}

/// Scrub an ordered sequence of labels element by element
pub fn scrub_sequential(
    values: &[String],
    scrubber: &dyn Scrubber,
    ctx: &mut ScrubContext,
) -> Vec<String> {
    values.iter().map(|v| scrubber.scrub(v, ctx)).collect()
}

/// Scrubs attribute mappings, one fresh numbering context per call
#[derive(Clone)]
pub struct RecursiveScrubber {
    scrubber: Arc<dyn Scrubber>,
}

impl RecursiveScrubber {
    pub fn new(scrubber: impl Scrubber + 'static) -> Self {
        Self {
            scrubber: Arc::new(scrubber),
        }
    }

    pub fn from_shared(scrubber: Arc<dyn Scrubber>) -> Self {
        Self { scrubber }
    }

    /// The no-op policy
    pub fn identity() -> Self {
        Self::new(IdentityScrubber)
    }

    pub fn scrub(&self, attrs: &Attrs) -> Attrs {
        let mut ctx = ScrubContext::new();
        scrub_recursive(attrs, self.scrubber.as_ref(), &mut ctx)
    }

    pub fn scrub_value(&self, value: &AttrValue) -> AttrValue {
        let mut ctx = ScrubContext::new();
        scrub_element(value, self.scrubber.as_ref(), &mut ctx)
    }

    pub fn inner(&self) -> &Arc<dyn Scrubber> {
        &self.scrubber
    }
}

impl Default for RecursiveScrubber {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for RecursiveScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RecursiveScrubber")
    }
}

/// Scrubs textual coordinate arrays, one fresh numbering context per call
#[derive(Clone)]
pub struct SequenceScrubber {
    scrubber: Arc<dyn Scrubber>,
}

impl SequenceScrubber {
    pub fn new(scrubber: impl Scrubber + 'static) -> Self {
        Self {
            scrubber: Arc::new(scrubber),
        }
    }

    pub fn from_shared(scrubber: Arc<dyn Scrubber>) -> Self {
        Self { scrubber }
    }

    pub fn identity() -> Self {
        Self::new(IdentityScrubber)
    }

    pub fn scrub(&self, values: &[String]) -> Vec<String> {
        let mut ctx = ScrubContext::new();
        scrub_sequential(values, self.scrubber.as_ref(), &mut ctx)
    }
}

impl Default for SequenceScrubber {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for SequenceScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SequenceScrubber")
    }
}
