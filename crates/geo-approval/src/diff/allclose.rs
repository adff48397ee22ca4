//! Approximate equality of two datasets with a bounded mismatch report.

use std::collections::BTreeMap;
use std::fmt;

use super::tolerance::Tolerance;
use crate::dataset::{unravel_index, ArrayData, LabeledDataset, Variable};
use crate::utils::config::{LISTING_ELLIPSIS, LISTING_SAMPLE_SIZE, MAX_LISTED_ELEMENTS};

/// Why two datasets are not close
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub tolerance: Tolerance,

    /// One entry per finding, already rendered
    pub details: Vec<String>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Received and approved datasets are not close ({})",
            self.tolerance
        )?;
        for detail in &self.details {
            write!(f, "\n{}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for Mismatch {}

/// Check every data variable and coordinate of two datasets
///
/// Reports names present on one side only, differing dimension names,
/// differing shapes and element values outside `tolerance`. Missing values
/// match missing values at the same position; text compares exactly.
pub fn assert_allclose(
    received: &LabeledDataset,
    approved: &LabeledDataset,
    tolerance: &Tolerance,
) -> Result<(), Mismatch> {
    let mut details = Vec::new();
    let sections = [
        ("data_vars", "Data variables", &received.data_vars, &approved.data_vars),
        ("coords", "Coordinates", &received.coords, &approved.coords),
    ];

    for (section, title, received_vars, approved_vars) in sections {
        let only_received = names_missing_from(received_vars, approved_vars);
        if !only_received.is_empty() {
            details.push(format!(
                "{} only on the received side: {}",
                title,
                only_received.join(", ")
            ));
        }
        let only_approved = names_missing_from(approved_vars, received_vars);
        if !only_approved.is_empty() {
            details.push(format!(
                "{} only on the approved side: {}",
                title,
                only_approved.join(", ")
            ));
        }

        for (name, r) in received_vars {
            if let Some(a) = approved_vars.get(name) {
                let scope = VariableScope {
                    section,
                    name,
                    dataset: received,
                };
                compare_variable(&scope, r, a, tolerance, &mut details);
            }
        }
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(Mismatch {
            tolerance: *tolerance,
            details,
        })
    }
}

struct VariableScope<'a> {
    section: &'a str,
    name: &'a str,
    dataset: &'a LabeledDataset,
}

fn compare_variable(
    scope: &VariableScope<'_>,
    received: &Variable,
    approved: &Variable,
    tolerance: &Tolerance,
    details: &mut Vec<String>,
) {
    let section = scope.section;
    let name = scope.name;
    if received.dims != approved.dims {
        details.push(format!(
            "Differing dimensions in {} '{}': received ({}) != approved ({})",
            section,
            name,
            received.dims.join(", "),
            approved.dims.join(", ")
        ));
        return;
    }
    if received.shape != approved.shape {
        details.push(format!(
            "Differing shapes in {} '{}': received {:?} != approved {:?}",
            section, name, received.shape, approved.shape
        ));
        return;
    }

    let count = match differing_positions(&received.data, &approved.data, tolerance) {
        Some(positions) => positions.count(),
        None => {
            details.push(format!(
                "Differing types in {} '{}': received {} != approved {}",
                section,
                name,
                kind_name(&received.data),
                kind_name(&approved.data)
            ));
            return;
        }
    };
    if count == 0 {
        return;
    }

    // second pass picks out only the sampled positions
    let sample = listing_sample(count);
    let wanted: BTreeMap<usize, usize> = sample
        .iter()
        .enumerate()
        .filter_map(|(slot, ordinal)| ordinal.map(|o| (o, slot)))
        .collect();
    let mut rendered: Vec<Option<String>> = vec![None; sample.len()];
    if let Some(positions) = differing_positions(&received.data, &approved.data, tolerance) {
        for (ordinal, flat) in positions.enumerate() {
            if let Some(&slot) = wanted.get(&ordinal) {
                let index = unravel_index(flat, &received.shape);
                rendered[slot] = Some(format!(
                    "    [{}][{}][{}]: {} != {}",
                    section,
                    name,
                    scope.dataset.position_label(received, &index),
                    received.data.element_label(flat),
                    approved.data.element_label(flat)
                ));
            }
        }
    }

    let mut out = format!(
        "Differing values in {} '{}' ({} of {} elements):",
        section,
        name,
        count,
        received.len()
    );
    for line in rendered {
        out.push('\n');
        match line {
            Some(line) => out.push_str(&line),
            None => {
                out.push_str("    ");
                out.push_str(LISTING_ELLIPSIS);
            }
        }
    }
    details.push(out);
}

// Flat offsets of elements outside tolerance; None when the kinds differ
fn differing_positions<'a>(
    received: &'a ArrayData,
    approved: &'a ArrayData,
    tolerance: &'a Tolerance,
) -> Option<Box<dyn Iterator<Item = usize> + 'a>> {
    match (received, approved) {
        (ArrayData::Numeric(r), ArrayData::Numeric(a)) => Some(Box::new(
            r.iter()
                .zip(a)
                .enumerate()
                .filter(move |(_, (r, a))| !tolerance.is_close(**r, **a))
                .map(|(i, _)| i),
        )),
        (ArrayData::Text(r), ArrayData::Text(a)) => Some(Box::new(
            r.iter()
                .zip(a)
                .enumerate()
                .filter(|(_, (r, a))| r != a)
                .map(|(i, _)| i),
        )),
        _ => None,
    }
}

fn kind_name(data: &ArrayData) -> &'static str {
    match data {
        ArrayData::Numeric(_) => "numeric",
        ArrayData::Text(_) => "text",
    }
}

fn names_missing_from<V>(from: &BTreeMap<String, V>, other: &BTreeMap<String, V>) -> Vec<String> {
    from.keys()
        .filter(|k| !other.contains_key(*k))
        .cloned()
        .collect()
}

/// Which of `n` ordered items to show; `None` marks an elision
///
/// Up to ten items are all shown. Longer listings keep the first three, the
/// three around the middle and the last three.
pub fn listing_sample(n: usize) -> Vec<Option<usize>> {
    if n <= MAX_LISTED_ELEMENTS {
        return (0..n).map(Some).collect();
    }
    let middle_start = n / 2 - LISTING_SAMPLE_SIZE / 2;
    let head = 0..LISTING_SAMPLE_SIZE;
    let middle = middle_start..middle_start + LISTING_SAMPLE_SIZE;
    let tail = n - LISTING_SAMPLE_SIZE..n;

    let mut sample: Vec<Option<usize>> = head.map(Some).collect();
    sample.push(None);
    sample.extend(middle.map(Some));
    sample.push(None);
    sample.extend(tail.map(Some));
    sample
}

/// Apply [`listing_sample`] to rendered items
pub fn truncate_listing(items: &[String]) -> Vec<String> {
    listing_sample(items.len())
        .into_iter()
        .map(|slot| match slot {
            Some(i) => items[i].clone(),
            None => LISTING_ELLIPSIS.to_string(),
        })
        .collect()
}
