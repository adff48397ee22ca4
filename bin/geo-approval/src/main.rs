//! Geo Approval CLI
//!
//! Compares received geospatial artifacts against approved references,
//! prints difference reports and promotes received artifacts.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use env_logger::Env;
use std::path::PathBuf;
use std::process::ExitCode;

use geo_approval::commands::{
    execute_approve, execute_compare, execute_placeholder, execute_report, ApproveArgs,
    CompareArgs, PlaceholderArgs, ReportArgs, Settings,
};
use geo_approval::format::FormatKind;

/// Geo Approval - approval testing for rasters, datasets and archives
#[derive(Parser, Debug)]
#[command(name = "geo-approval")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./approval-geo.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root directory the configured input/approved paths are relative to
    #[arg(long, global = true, env = "APPROVAL_GEO_DATA_ROOT")]
    data_root: Option<PathBuf>,
}

/// Received/approved pair shared by compare and report
#[derive(Args, Debug)]
struct Pair {
    /// Received artifact
    received: PathBuf,

    /// Approved reference artifact
    approved: PathBuf,

    /// Artifact format: raster, dataset or archive (guessed from extensions if omitted)
    #[arg(short, long)]
    format: Option<FormatKind>,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether a received artifact matches the approved one
    Compare {
        #[command(flatten)]
        pair: Pair,

        /// Print the difference report on mismatch
        #[arg(long)]
        report: bool,
    },

    /// Print the difference report and the approval command
    Report {
        #[command(flatten)]
        pair: Pair,
    },

    /// Write an empty artifact, e.g. to seed a new approval
    Placeholder {
        /// Output path
        path: PathBuf,

        /// Artifact format (guessed from the extension if omitted)
        #[arg(short, long)]
        format: Option<FormatKind>,

        /// Replace an existing artifact
        #[arg(long)]
        force: bool,
    },

    /// Accept a received artifact as the new approved reference
    Approve {
        /// Received artifact
        received: PathBuf,

        /// Approved artifact to replace
        approved: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let settings = Settings {
        config: cli.config,
        data_root: cli.data_root,
    };

    // Execute command
    match cli.command {
        Commands::Compare { pair, report } => {
            let equivalent = execute_compare(CompareArgs {
                received: pair.received,
                approved: pair.approved,
                format: pair.format,
                report,
                settings,
            })?;
            if !equivalent {
                eprintln!("{}", "Artifacts differ".red().bold());
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Report { pair } => {
            execute_report(ReportArgs {
                received: pair.received,
                approved: pair.approved,
                format: pair.format,
                settings,
            })?;
        }

        Commands::Placeholder {
            path,
            format,
            force,
        } => {
            execute_placeholder(PlaceholderArgs { path, format, force })?;
        }

        Commands::Approve { received, approved } => {
            execute_approve(ApproveArgs { received, approved })?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
