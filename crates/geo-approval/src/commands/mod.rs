//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands wire config loading, format detection and the comparison
//! engine together for the binary.

pub mod approve;
pub mod compare;
pub mod models;
pub mod placeholder;
pub mod report;
pub mod utils;

// Re-export main command functions
pub use approve::execute_approve;
pub use compare::execute_compare;
pub use models::{ApproveArgs, CompareArgs, PlaceholderArgs, ReportArgs, Settings};
pub use placeholder::execute_placeholder;
pub use report::execute_report;
pub use utils::{load_options, resolve_format};
