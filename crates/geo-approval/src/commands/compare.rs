//! Compare command implementation.
//! Decides whether a received artifact matches the approved one.

use anyhow::{Context, Result};
use colored::*;
use log::info;

use super::models::CompareArgs;
use super::utils::{load_options, resolve_format};
use crate::comparator::Comparator;
use crate::reporter::Reporter;

/// Execute the compare command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// `true` when the artifacts are equivalent
///
/// # Errors
/// * Config or format detection failures
/// * Unreadable or malformed artifacts
pub fn execute_compare(args: CompareArgs) -> Result<bool> {
    // Step 1: Resolve format and options
    let kind = resolve_format(args.format, &[&args.approved, &args.received])?;
    let options = load_options(&args.settings)?;

    // Step 2: Compare
    let comparator = Comparator::new(options.differ(kind.format()));
    let equivalent = comparator
        .equivalent(&args.received, &args.approved)
        .context("Failed to compare artifacts")?;

    if equivalent {
        info!("{} artifacts are equivalent", kind);
        println!("{} {}", "✔".green(), args.approved.display());
        return Ok(true);
    }

    println!(
        "{} {} differs from {}",
        "✘".red(),
        args.received.display().to_string().yellow(),
        args.approved.display().to_string().cyan()
    );

    // Step 3: Optional report
    if args.report && args.received.exists() {
        Reporter::new(comparator.into_differ())
            .report(&args.received, &args.approved)
            .context("Failed to write difference report")?;
    }

    Ok(false)
}
