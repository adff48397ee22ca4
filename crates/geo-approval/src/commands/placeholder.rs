//! Placeholder command implementation.
//! Writes the minimal empty artifact of a format.

use anyhow::{bail, Context, Result};
use colored::*;

use super::models::PlaceholderArgs;
use super::utils::resolve_format;
use crate::io::remove_artifact;

/// Execute the placeholder command
pub fn execute_placeholder(args: PlaceholderArgs) -> Result<()> {
    let kind = resolve_format(args.format, &[&args.path])?;

    if args.path.exists() {
        if !args.force {
            bail!("{} already exists; pass --force to replace it", args.path.display());
        }
        remove_artifact(&args.path).context("Failed to remove existing artifact")?;
    }

    kind.format()
        .create_empty(&args.path)
        .with_context(|| format!("Failed to write {} placeholder", kind))?;
    println!(
        "📄 Empty {} written to {}",
        kind,
        args.path.display().to_string().cyan()
    );
    Ok(())
}
