//! Regex based scrubbers and the built-in presets.

use regex::{Captures, Regex};
use std::fmt;
use std::sync::Arc;

use super::{ChainScrubber, IdentityScrubber, ScrubContext, ScrubError, Scrubber};

// ISO-8601 style timestamps first so a bare date never eats half of one
const DATE_PATTERN: &str = r"\d{4}-\d{2}-\d{2}[T ]\d{2}[:-]\d{2}[:-]\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?|\d{4}-\d{2}-\d{2}";
const GUID_PATTERN: &str =
    r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}";
const YEODA_DATE_PATTERN: &str = r"\d{8}T\d{6}";
const SHORT_COMMIT_PATTERN: &str = r"\b[0-9a-f]{7}\b";
const VERSION_TAG_PATTERN: &str = r"\bv\d+(?:\.\d+)+\b";

type Render = Arc<dyn Fn(usize) -> String + Send + Sync>;

/// Replaces every regex match with a numbered placeholder
#[derive(Clone)]
pub struct RegexScrubber {
    regex: Regex,
    namespace: String,
    render: Render,
}

impl RegexScrubber {
    /// Build a scrubber from a pattern and a placeholder renderer
    ///
    /// # Errors
    /// * `ScrubError::InvalidPattern` - If the pattern does not compile
    pub fn new(
        pattern: &str,
        namespace: impl Into<String>,
        render: impl Fn(usize) -> String + Send + Sync + 'static,
    ) -> Result<Self, ScrubError> {
        let regex = Regex::new(pattern).map_err(|source| ScrubError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            regex,
            namespace: namespace.into(),
            render: Arc::new(render),
        })
    }

    /// Placeholders of the form `<{prefix}{n}>`, numbered per `prefix`
    pub fn with_prefix(pattern: &str, prefix: &str) -> Result<Self, ScrubError> {
        let owned = prefix.to_string();
        Self::new(pattern, prefix, move |n| format!("<{}{}>", owned, n))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Scrubber for RegexScrubber {
    fn scrub(&self, text: &str, ctx: &mut ScrubContext) -> String {
        self.regex
            .replace_all(text, |caps: &Captures| {
                let index = ctx.index_of(&self.namespace, &caps[0]);
                (self.render)(index)
            })
            .into_owned()
    }
}

impl fmt::Debug for RegexScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexScrubber")
            .field("pattern", &self.regex.as_str())
            .field("namespace", &self.namespace)
            .finish()
    }
}

/// Dates and timestamps → `<date0>`, `<date1>`, ...
pub fn date_scrubber() -> Result<RegexScrubber, ScrubError> {
    RegexScrubber::with_prefix(DATE_PATTERN, "date")
}

/// GUIDs → `<guid_0>`, ...
pub fn guid_scrubber() -> Result<RegexScrubber, ScrubError> {
    RegexScrubber::with_prefix(GUID_PATTERN, "guid_")
}

/// Compact datacube timestamps (`20220101T235959`) → `<yeoda_date0>`, ...
pub fn yeoda_date_scrubber() -> Result<RegexScrubber, ScrubError> {
    RegexScrubber::with_prefix(YEODA_DATE_PATTERN, "yeoda_date")
}

/// Seven character commit hashes → `<short_commit_0>`, ...
pub fn short_commit_scrubber() -> Result<RegexScrubber, ScrubError> {
    RegexScrubber::with_prefix(SHORT_COMMIT_PATTERN, "short_commit_")
}

/// Release tags (`v1.0.2`) → `<tag_0>`, ...
pub fn version_tag_scrubber() -> Result<RegexScrubber, ScrubError> {
    RegexScrubber::with_prefix(VERSION_TAG_PATTERN, "tag_")
}

/// Everything a yeoda datacube stamps into its metadata
pub fn yeoda_metadata_scrubber() -> Result<ChainScrubber, ScrubError> {
    Ok(ChainScrubber::new()
        .then(date_scrubber()?)
        .then(yeoda_date_scrubber()?)
        .then(short_commit_scrubber()?)
        .then(version_tag_scrubber()?))
}

/// Look up a built-in scrubber by its config name
///
/// # Errors
/// * `ScrubError::UnknownPreset` - If the name is not a known preset
pub fn preset(name: &str) -> Result<Arc<dyn Scrubber>, ScrubError> {
    let scrubber: Arc<dyn Scrubber> = match name {
        "identity" | "none" => Arc::new(IdentityScrubber),
        "dates" => Arc::new(date_scrubber()?),
        "guids" => Arc::new(guid_scrubber()?),
        "yeoda_dates" => Arc::new(yeoda_date_scrubber()?),
        "short_commits" => Arc::new(short_commit_scrubber()?),
        "version_tags" => Arc::new(version_tag_scrubber()?),
        "yeoda" => Arc::new(yeoda_metadata_scrubber()?),
        other => return Err(ScrubError::UnknownPreset(other.to_string())),
    };
    Ok(scrubber)
}
