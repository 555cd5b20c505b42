//! Analysis result types.

use serde::Serialize;

use super::AnalysisError;

/// Verdict produced by every analyzer variant.
///
/// The score is always within `0.0..=1.0` and never NaN; construction goes
/// through [`ComplianceResult::new`], which enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComplianceResult {
    is_compliant: bool,
    score: f32,
}

impl ComplianceResult {
    /// Creates a result, clamping `score` into `0.0..=1.0` (NaN becomes 0.0).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(is_compliant: bool, score: f64) -> Self {
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0) as f32
        };
        Self {
            is_compliant,
            score,
        }
    }

    /// Whether the required marker was judged present.
    #[must_use]
    pub const fn is_compliant(&self) -> bool {
        self.is_compliant
    }

    /// Confidence in `0.0..=1.0`. Higher means more confident, not more compliant.
    #[must_use]
    pub const fn score(&self) -> f32 {
        self.score
    }
}

/// A single output record for one analyzed image.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceRecord {
    /// Path or reference of the analyzed image.
    pub path: String,
    /// Timestamp of analysis (ISO 8601).
    pub timestamp: String,
    /// Name of the analyzer that produced the outcome.
    pub analyzer: String,
    /// Verdict or failure.
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

/// Outcome part of a [`ComplianceRecord`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RecordOutcome {
    /// The analyzer produced a verdict.
    Verdict {
        /// Whether the marker was judged present.
        is_compliant: bool,
        /// Score rounded to 4 decimals.
        score: f64,
    },
    /// The analysis failed.
    Failed {
        /// Error kind (see [`AnalysisError::kind`]).
        error: String,
        /// Error message.
        message: String,
    },
}

impl RecordOutcome {
    /// Whether this outcome is a non-compliant verdict.
    #[must_use]
    pub const fn is_non_compliant(&self) -> bool {
        matches!(
            self,
            Self::Verdict {
                is_compliant: false,
                ..
            }
        )
    }

    /// Whether this outcome is a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl From<ComplianceResult> for RecordOutcome {
    fn from(result: ComplianceResult) -> Self {
        let score = (f64::from(result.score()) * 10_000.0).round() / 10_000.0;
        Self::Verdict {
            is_compliant: result.is_compliant(),
            score,
        }
    }
}

impl From<&AnalysisError> for RecordOutcome {
    fn from(err: &AnalysisError) -> Self {
        Self::Failed {
            error: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
