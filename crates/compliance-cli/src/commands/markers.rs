//! Markers command - show where the template matcher looks for its references.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use compliance_adapters::markers::all_markers_present;
use compliance_adapters::{list_markers, markers_dir};

use super::ExitCode;
use crate::config::AppConfig;

/// Arguments for the markers command
#[derive(Args)]
pub struct MarkersArgs {
    #[command(subcommand)]
    pub command: MarkersCommand,

    /// Marker directory (overrides config and default)
    #[arg(long, value_name = "DIR", global = true)]
    pub marker_dir: Option<PathBuf>,
}

/// Markers subcommands
#[derive(Subcommand)]
pub enum MarkersCommand {
    /// List the pass and fail markers and whether they exist
    List,
    /// Print the marker directory path
    Path,
}

/// Run the markers command.
///
/// `list` exits with [`ExitCode::Error`] when a marker is missing so scripts
/// can check readiness before running the template analyzer.
pub fn run(args: &MarkersArgs, config: &AppConfig) -> ExitCode {
    let custom = args
        .marker_dir
        .as_deref()
        .or(config.template.marker_dir.as_deref());
    let dir = markers_dir(custom);

    match args.command {
        MarkersCommand::List => list(&dir),
        MarkersCommand::Path => {
            println!("{}", dir.display());
            ExitCode::Success
        }
    }
}

fn list(dir: &Path) -> ExitCode {
    let markers = list_markers(dir);

    println!("Markers directory: {}", dir.display());
    println!();

    for marker in &markers {
        let status = if marker.present { "✓" } else { "✗" };
        println!(
            "  {status} {} ({})",
            marker.role.as_str(),
            marker.path.display()
        );
    }

    println!();
    let present = markers.iter().filter(|m| m.present).count();
    println!("{}/{} markers present", present, markers.len());

    if all_markers_present(dir) {
        ExitCode::Success
    } else {
        ExitCode::Error
    }
}
