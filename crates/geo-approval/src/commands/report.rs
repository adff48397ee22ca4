//! Report command implementation.

use anyhow::{bail, Context, Result};

use super::models::ReportArgs;
use super::utils::{load_options, resolve_format};
use crate::reporter::Reporter;

/// Execute the report command
///
/// Prints the difference report and the approval command. A missing approved
/// artifact is seeded with an empty placeholder first.
pub fn execute_report(args: ReportArgs) -> Result<()> {
    if !args.received.exists() {
        bail!("Received artifact {} does not exist", args.received.display());
    }
    let kind = resolve_format(args.format, &[&args.approved, &args.received])?;
    let options = load_options(&args.settings)?;

    Reporter::new(options.differ(kind.format()))
        .report(&args.received, &args.approved)
        .context("Failed to write difference report")?;
    Ok(())
}
