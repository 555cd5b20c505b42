//! Error taxonomy surfaced by the compliance engine.

use std::path::PathBuf;

use thiserror::Error;

/// Every failure the engine reports to its caller.
///
/// Analyzer internals (decoder errors, I/O errors, transport errors) are
/// mapped into one of these variants before leaving the engine.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The bytes are not a valid or supported image.
    #[error("image could not be decoded: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// The image file or stored reference could not be read.
    #[error("image {location} could not be read: {source}")]
    ImageUnreadable {
        /// Path or storage reference that failed.
        location: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A template marker could not be loaded at startup.
    #[error("reference marker {} could not be loaded: {source}", path.display())]
    ReferenceAssetMissing {
        /// Marker asset path.
        path: PathBuf,
        /// Underlying decode or I/O error.
        #[source]
        source: image::ImageError,
    },

    /// The remote prediction service failed or answered with garbage.
    #[error("analysis service unavailable: {reason}")]
    AnalysisUnavailable {
        /// Human-readable failure description.
        reason: String,
    },

    /// The caller cancelled the analysis.
    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Builds an [`AnalysisError::AnalysisUnavailable`] from any displayable reason.
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        Self::AnalysisUnavailable {
            reason: reason.to_string(),
        }
    }

    /// Stable snake_case identifier for the error kind, used in output records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ImageDecode(_) => "image_decode",
            Self::ImageUnreadable { .. } => "image_unreadable",
            Self::ReferenceAssetMissing { .. } => "reference_asset_missing",
            Self::AnalysisUnavailable { .. } => "analysis_unavailable",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<image::ImageError> for AnalysisError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageDecode(err)
    }
}
