//! Scrubbers for volatile metadata.
//!
//! A scrubber rewrites volatile substrings (dates, GUIDs, commit hashes,
//! version tags) into stable placeholders before two artifacts are compared.
//! Distinct matches are numbered through an explicit [`ScrubContext`], so the
//! same original text maps to the same placeholder for the whole scrub call.
//!
//! # Example
//! ```ignore
//! use geo_approval::scrub::{date_scrubber, RecursiveScrubber};
//!
//! let scrubber = RecursiveScrubber::new(date_scrubber()?);
//! let stable = scrubber.scrub(&dataset.attrs);
//! ```

mod patterns;
mod recursive;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

// Public API exports
pub use patterns::{
    date_scrubber, guid_scrubber, preset, short_commit_scrubber, version_tag_scrubber,
    yeoda_date_scrubber, yeoda_metadata_scrubber, RegexScrubber,
};
pub use recursive::{
    scrub_element, scrub_recursive, scrub_sequential, RecursiveScrubber, SequenceScrubber,
};

#[derive(Error, Debug)]
pub enum ScrubError {
    #[error("Invalid scrubber pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown scrubber preset: {0}")]
    UnknownPreset(String),
}

/// Numbering state for one scrub call
///
/// Each namespace (`date`, `guid`, ...) keeps its own table from matched
/// text to the index first assigned to it.
#[derive(Debug, Clone, Default)]
pub struct ScrubContext {
    seen: HashMap<String, HashMap<String, usize>>,
}

impl ScrubContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `original` within `namespace`, assigning the next free one
    pub fn index_of(&mut self, namespace: &str, original: &str) -> usize {
        let table = self.seen.entry(namespace.to_string()).or_default();
        let next = table.len();
        *table.entry(original.to_string()).or_insert(next)
    }

    /// Number of distinct matches seen in a namespace
    pub fn distinct(&self, namespace: &str) -> usize {
        self.seen.get(namespace).map(HashMap::len).unwrap_or(0)
    }
}

/// A text rewrite rule
pub trait Scrubber: Send + Sync {
    fn scrub(&self, text: &str, ctx: &mut ScrubContext) -> String;

    /// Scrub a standalone string with a fresh context
    fn scrub_str(&self, text: &str) -> String {
        self.scrub(text, &mut ScrubContext::new())
    }
}

/// Leaves text untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityScrubber;

impl Scrubber for IdentityScrubber {
    fn scrub(&self, text: &str, _ctx: &mut ScrubContext) -> String {
        text.to_string()
    }
}

/// Adapts a plain `&str -> String` function; no numbering involved
pub struct FnScrubber<F>(pub F);

impl<F> Scrubber for FnScrubber<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn scrub(&self, text: &str, _ctx: &mut ScrubContext) -> String {
        (self.0)(text)
    }
}

/// Applies several scrubbers in order, sharing one context
#[derive(Clone, Default)]
pub struct ChainScrubber {
    scrubbers: Vec<Arc<dyn Scrubber>>,
}

impl ChainScrubber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, scrubber: impl Scrubber + 'static) -> Self {
        self.scrubbers.push(Arc::new(scrubber));
        self
    }

    pub fn then_shared(mut self, scrubber: Arc<dyn Scrubber>) -> Self {
        self.scrubbers.push(scrubber);
        self
    }

    pub fn len(&self) -> usize {
        self.scrubbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrubbers.is_empty()
    }
}

impl Scrubber for ChainScrubber {
    fn scrub(&self, text: &str, ctx: &mut ScrubContext) -> String {
        self.scrubbers
            .iter()
            .fold(text.to_string(), |acc, scrubber| scrubber.scrub(&acc, ctx))
    }
}

impl fmt::Debug for ChainScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainScrubber")
            .field("len", &self.scrubbers.len())
            .finish()
    }
}
