//! CLI command definitions and handlers.

pub mod check;
pub mod markers;

use clap::{Parser, Subcommand};

/// Shift Compliance - check end-of-shift photos for the compliance marker
#[derive(Parser)]
#[command(name = "shift-compliance")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shared check arguments (paths, analyzer, flags).
    #[command(flatten)]
    pub check: check::CheckArgs,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Analyze photos for the compliance marker
    Check(check::CheckArgs),
    /// Show reference marker locations
    Markers(markers::MarkersArgs),
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every analyzed photo is compliant.
    Success = 0,
    /// At least one photo is non-compliant.
    NonCompliant = 1,
    /// Setup failed, an analysis failed, or the run was interrupted.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}

