//! Approve command implementation.

use anyhow::{Context, Result};
use colored::*;

use super::models::ApproveArgs;
use crate::verify::approve;

/// Execute the approve command: move the received artifact over the approved one
pub fn execute_approve(args: ApproveArgs) -> Result<()> {
    approve(&args.received, &args.approved).with_context(|| {
        format!(
            "Failed to approve {} as {}",
            args.received.display(),
            args.approved.display()
        )
    })?;
    println!("{} {}", "Approved".green().bold(), args.approved.display());
    Ok(())
}
