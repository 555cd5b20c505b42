//! Progress reporting port for UI integration.

use crate::domain::ComplianceRecord;

/// Events emitted during a batch run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Analysis started for an image.
    Started {
        /// Path or reference of the image.
        path: String,
        /// Index in the batch (0-based).
        index: usize,
        /// Total images in batch, if known.
        total: Option<usize>,
    },
    /// Analysis produced a record (verdict or failure).
    Completed {
        /// The output record.
        record: ComplianceRecord,
    },
    /// An entry was skipped before analysis.
    Skipped {
        /// Path of the entry.
        path: String,
        /// Reason for skipping.
        reason: String,
    },
    /// The batch is done.
    Finished(BatchSummary),
}

/// Counts for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Records produced, including failures.
    pub processed: usize,
    /// Compliant verdicts.
    pub compliant: usize,
    /// Non-compliant verdicts.
    pub non_compliant: usize,
    /// Analyses that failed.
    pub failed: usize,
    /// Entries skipped before analysis.
    pub skipped: usize,
}

impl BatchSummary {
    /// Counts one record.
    pub fn record(&mut self, record: &ComplianceRecord) {
        self.processed += 1;
        if record.outcome.is_failure() {
            self.failed += 1;
        } else if record.outcome.is_non_compliant() {
            self.non_compliant += 1;
        } else {
            self.compliant += 1;
        }
    }
}

/// Port for receiving progress events.
pub trait ProgressSink: Send + Sync {
    /// Called when a progress event occurs.
    fn on_event(&self, event: ProgressEvent);
}
