//! Core domain types for compliance analysis.

mod analyzer;
mod error;
mod raster;
mod result;

pub use analyzer::ImageAnalyzer;
pub use error::AnalysisError;
pub use raster::{resample_square, ImageHandle, RasterImage};
pub use result::{ComplianceRecord, ComplianceResult, RecordOutcome};
