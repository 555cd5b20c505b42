//! JSON output adapter.

use anyhow::Result;
use compliance_core::{ComplianceRecord, ResultOutput};
use std::io::{self, Write};
use std::sync::Mutex;

/// JSON Lines output adapter.
pub struct JsonOutput {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl ResultOutput for JsonOutput {
    #[allow(clippy::significant_drop_tightening)]
    fn write(&self, record: &ComplianceRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writeln!(writer, "{json}")?;
        Ok(())
    }

    /// Writes the batch as a single JSON array.
    #[allow(clippy::significant_drop_tightening)]
    fn write_batch(&self, records: &[ComplianceRecord], pretty: bool) -> Result<()> {
        let json = if pretty {
            serde_json::to_string_pretty(records)?
        } else {
            serde_json::to_string(records)?
        };
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writeln!(writer, "{json}")?;
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    fn flush(&self) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use compliance_core::{AnalysisError, ComplianceResult};
    use std::sync::Arc;

    /// Cloneable in-memory sink.
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn record(path: &str, compliant: bool) -> ComplianceRecord {
        ComplianceRecord {
            path: path.to_string(),
            timestamp: "2025-09-01T18:00:00Z".to_string(),
            analyzer: "color_coverage".to_string(),
            outcome: ComplianceResult::new(compliant, 0.75).into(),
        }
    }

    #[test]
    fn test_jsonl_one_object_per_line() {
        let sink = Shared::default();
        let output = JsonOutput::new(Box::new(sink.clone()));
        output.write(&record("a.jpg", true)).unwrap();
        output.write(&record("b.jpg", false)).unwrap();
        output.flush().unwrap();

        let text = sink.text();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["path"], "a.jpg");
        assert_eq!(first["is_compliant"], true);
        assert_eq!(first["score"], 0.75);
    }

    #[test]
    fn test_array_includes_failures() {
        let sink = Shared::default();
        let output = JsonOutput::new(Box::new(sink.clone()));
        let failed = ComplianceRecord {
            outcome: (&AnalysisError::Cancelled).into(),
            ..record("c.png", true)
        };
        output
            .write_batch(&[record("a.jpg", true), failed], true)
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&sink.text()).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["error"], "cancelled");
        assert_eq!(items[1]["message"], "analysis cancelled");
    }
}
