//! Analyzer trait shared by the local marker checks.

use super::{ComplianceResult, RasterImage};

/// Trait for analyzers that decide compliance from decoded pixels alone.
///
/// Implementations are pure functions of the pixel data and their static
/// configuration, so they are shared across threads without locking and
/// return identical results for identical input.
pub trait ImageAnalyzer: Send + Sync {
    /// Returns the name of this analyzer.
    fn name(&self) -> &'static str;

    /// Analyzes a decoded image and returns the verdict.
    ///
    /// # Arguments
    ///
    /// * `image` - The decoded photo
    fn analyze(&self, image: &RasterImage) -> ComplianceResult;
}
