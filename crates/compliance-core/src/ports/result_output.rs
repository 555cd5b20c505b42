//! Result output port for writing compliance records.

use crate::domain::ComplianceRecord;

/// Port for outputting compliance records.
pub trait ResultOutput: Send + Sync {
    /// Writes a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write(&self, record: &ComplianceRecord) -> anyhow::Result<()>;

    /// Writes a whole batch at once. Defaults to one `write` per record.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_batch(&self, records: &[ComplianceRecord], _pretty: bool) -> anyhow::Result<()> {
        records.iter().try_for_each(|record| self.write(record))
    }

    /// Flushes any buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&self) -> anyhow::Result<()>;
}
