//! Analyzer implementations.
//!
//! The three local analyzers implement [`ImageAnalyzer`](crate::ImageAnalyzer)
//! and decide from pixels alone. The remote analyzer is asynchronous and
//! delegates to a prediction service.

mod coverage;
mod luminance;
mod remote;
mod template;

pub use coverage::{
    ColorCoverageAnalyzer, ColorCoverageConfig, CoverageAnalysis, CoverageTally, HueBand,
};
pub use luminance::{LuminanceAnalysis, LuminanceAnalyzer, LuminanceConfig};
pub use remote::{interpret, RemoteClassifierAnalyzer, RemoteClassifierConfig};
pub use template::{
    mean_similarity, MarkerReferences, TemplateMatch, TemplateMatchAnalyzer, TemplateMatchConfig,
    FAIL_MARKER_FILE, PASS_MARKER_FILE,
};
