//! Shift Compliance Core - marker detection for end-of-shift photos
//!
//! This crate contains the domain types, color-space math, region sampling,
//! the analyzer variants (luminance, color coverage, template match, remote
//! classifier) and the engine that binds exactly one of them per process.

pub mod color;
pub mod domain;
pub mod engine;
pub mod modules;
pub mod ports;
pub mod sampling;

pub use domain::{
    AnalysisError, ComplianceRecord, ComplianceResult, ImageAnalyzer, ImageHandle, RasterImage,
    RecordOutcome,
};
pub use engine::{Analyzer, AnalyzerKind, ComplianceEngine, LocalAnalyzer};
pub use ports::{
    BatchSummary, ImageSource, ImageStore, PredictionReply, PredictionRequest,
    PredictionTransport, ProgressEvent, ProgressSink, ResultOutput, TransportError,
};
