//! Attribute and tag diff rendering.

use serde::Serialize;
use similar::TextDiff;
use std::collections::BTreeMap;

use crate::dataset::{AttrValue, Attrs};

const CONTEXT_RADIUS: usize = 3;

/// Render the differences between two attribute maps
///
/// Returns an empty string when both maps are equal. Keys appear in sorted
/// order; `L` lines show the approved value and `R` lines the received one.
pub fn diff_attrs(approved: &Attrs, received: &Attrs) -> String {
    if approved == received {
        return String::new();
    }

    let only_approved: Vec<_> = approved
        .iter()
        .filter(|(key, _)| !received.contains_key(*key))
        .collect();
    let only_received: Vec<_> = received
        .iter()
        .filter(|(key, _)| !approved.contains_key(*key))
        .collect();
    let differing: Vec<_> = approved
        .iter()
        .filter_map(|(key, a)| match received.get(key) {
            Some(r) if r != a => Some((key, a, r)),
            _ => None,
        })
        .collect();

    let mut sections = Vec::new();
    if !only_approved.is_empty() {
        sections.push(listing("Attributes only on the approved side:", &only_approved));
    }
    if !only_received.is_empty() {
        sections.push(listing("Attributes only on the received side:", &only_received));
    }
    if !differing.is_empty() {
        let mut out = String::from("Differing attributes:");
        for (key, a, r) in differing {
            out.push_str(&format!("\nL   {}: {}", key, a));
            out.push_str(&format!("\nR   {}: {}", key, r));
        }
        sections.push(out);
    }
    sections.join("\n")
}

fn listing(title: &str, entries: &[(&String, &AttrValue)]) -> String {
    let mut out = title.to_string();
    for (key, value) in entries {
        out.push_str(&format!("\n    {}: {}", key, value));
    }
    out
}

/// Unified line diff of two flat tag maps rendered as indented JSON
///
/// Returns an empty string when the renderings are identical.
pub fn unified_tags_diff(
    approved_name: &str,
    approved: &BTreeMap<String, String>,
    received_name: &str,
    received: &BTreeMap<String, String>,
) -> String {
    let approved_text = tags_to_json(approved);
    let received_text = tags_to_json(received);
    if approved_text == received_text {
        return String::new();
    }
    TextDiff::from_lines(&approved_text, &received_text)
        .unified_diff()
        .context_radius(CONTEXT_RADIUS)
        .header(approved_name, received_name)
        .to_string()
        .trim()
        .to_string()
}

fn tags_to_json(tags: &BTreeMap<String, String>) -> String {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    // a map of strings always serializes
    if tags.serialize(&mut serializer).is_err() {
        return String::new();
    }
    let mut text = String::from_utf8_lossy(&buffer).into_owned();
    text.push('\n');
    text
}

/// Convert flat tags into attributes so they can be scrubbed
pub fn tags_to_attrs(tags: &BTreeMap<String, String>) -> Attrs {
    tags.iter()
        .map(|(k, v)| (k.clone(), AttrValue::from(v.as_str())))
        .collect()
}

/// Convert attributes back into flat tags
pub fn attrs_to_tags(attrs: &Attrs) -> BTreeMap<String, String> {
    attrs
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect()
}
