//! Progress bar adapter using indicatif.

use compliance_core::{ProgressEvent, ProgressSink, RecordOutcome};
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

/// Progress bar adapter for CLI output.
pub struct ProgressBar {
    bar: Option<IndicatifBar>,
    quiet: bool,
}

impl ProgressBar {
    /// Creates a new progress bar.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of items, if known
    /// * `quiet` - If true, suppress all output
    /// * `show_bar` - If true, show progress bar; otherwise show per-item status
    #[must_use]
    pub fn new(total: Option<u64>, quiet: bool, show_bar: bool) -> Self {
        if quiet {
            return Self {
                bar: None,
                quiet: true,
            };
        }

        let bar = if show_bar {
            let bar = total.map_or_else(IndicatifBar::new_spinner, IndicatifBar::new);

            if let Ok(style) = ProgressStyle::default_bar().template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            ) {
                bar.set_style(style.progress_chars("#>-"));
            }

            Some(bar)
        } else {
            None
        };

        Self { bar, quiet }
    }
}

impl ProgressSink for ProgressBar {
    fn on_event(&self, event: ProgressEvent) {
        if self.quiet {
            return;
        }

        match event {
            ProgressEvent::Started { path, index, total } => {
                if let Some(bar) = &self.bar {
                    if let Some(t) = total {
                        bar.set_length(t as u64);
                    }
                    bar.set_position(index as u64);
                    bar.set_message(path);
                }
            }
            ProgressEvent::Completed { record } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                } else {
                    match record.outcome {
                        RecordOutcome::Verdict {
                            is_compliant: false,
                            score,
                        } => eprintln!("{}: non-compliant (score {score})", record.path),
                        RecordOutcome::Failed { message, .. } => {
                            eprintln!("{}: failed: {message}", record.path);
                        }
                        RecordOutcome::Verdict { .. } => {}
                    }
                }
            }
            ProgressEvent::Skipped { path, reason } => {
                if let Some(bar) = &self.bar {
                    bar.inc(1);
                }
                eprintln!("WARN: Skipping {path}: {reason}");
            }
            ProgressEvent::Finished(summary) => {
                let line = format!(
                    "Done: {} processed ({} compliant, {} non-compliant, {} failed), {} skipped",
                    summary.processed,
                    summary.compliant,
                    summary.non_compliant,
                    summary.failed,
                    summary.skipped
                );
                if let Some(bar) = &self.bar {
                    bar.finish_with_message(line);
                } else {
                    eprintln!("{line}");
                }
            }
        }
    }
}
