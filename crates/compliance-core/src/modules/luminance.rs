//! Luminance analyzer.
//!
//! Averages BT.709 luminance over a sparse lattice and compares it against a
//! fixed brightness threshold.

use crate::domain::{ComplianceResult, ImageAnalyzer, RasterImage};
use crate::sampling::{GridPolicy, RegionSampler};

/// Configuration for the luminance analyzer.
#[derive(Debug, Clone)]
pub struct LuminanceConfig {
    /// Average luminance (0.0-1.0) at or above which the image is compliant.
    pub threshold: f32,
    /// Lattice density.
    pub grid: GridPolicy,
}

impl Default for LuminanceConfig {
    fn default() -> Self {
        Self {
            threshold: 0.55,
            grid: GridPolicy::DEFAULT,
        }
    }
}

/// Luminance statistics for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminanceAnalysis {
    /// Mean luminance over the sampled lattice.
    pub mean: f64,
    /// Number of sampled pixels.
    pub samples: u64,
}

impl LuminanceAnalysis {
    /// Samples the image on the lattice described by `grid`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn measure(image: &RasterImage, grid: &GridPolicy) -> Self {
        let (width, height) = image.dimensions();
        let lattice = RegionSampler::grid(grid, width, height);

        let (total, samples) = lattice
            .points()
            .fold((0.0_f64, 0_u64), |(total, count), (x, y)| {
                (total + image.sample(x, y).luminance(), count + 1)
            });

        // Precision loss acceptable for statistical purposes
        let mean = total / samples.max(1) as f64;
        Self { mean, samples }
    }

    /// Whether the mean reaches `threshold`, compared at the threshold's
    /// `f32` precision.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn meets(&self, threshold: f32) -> bool {
        self.mean as f32 >= threshold
    }
}

/// Brightness-threshold analyzer.
pub struct LuminanceAnalyzer {
    config: LuminanceConfig,
}

impl LuminanceAnalyzer {
    /// Creates a new luminance analyzer with the given configuration.
    #[must_use]
    pub const fn new(config: LuminanceConfig) -> Self {
        Self { config }
    }

    /// Returns the analyzer configuration.
    #[must_use]
    pub const fn config(&self) -> &LuminanceConfig {
        &self.config
    }
}

impl Default for LuminanceAnalyzer {
    fn default() -> Self {
        Self::new(LuminanceConfig::default())
    }
}

impl ImageAnalyzer for LuminanceAnalyzer {
    fn name(&self) -> &'static str {
        "luminance"
    }

    fn analyze(&self, image: &RasterImage) -> ComplianceResult {
        let analysis = LuminanceAnalysis::measure(image, &self.config.grid);
        ComplianceResult::new(analysis.meets(self.config.threshold), analysis.mean)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::color::ColorSample;
    use image::{DynamicImage, Rgb, RgbImage};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RasterImage {
        RasterImage::from_dynamic(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb(rgb),
        )))
    }

    #[test]
    fn test_default_config() {
        let config = LuminanceConfig::default();
        assert!((config.threshold - 0.55).abs() < f32::EPSILON);
        assert_eq!(config.grid.target_samples, 512);
    }

    #[test]
    fn test_analyzer_name() {
        assert_eq!(LuminanceAnalyzer::default().name(), "luminance");
    }

    #[test]
    fn test_mid_gray_is_below_threshold() {
        let result = LuminanceAnalyzer::default().analyze(&solid(64, 64, [128, 128, 128]));
        assert!(!result.is_compliant());
        assert!(
            (result.score() - 0.502).abs() < 0.001,
            "score {}",
            result.score()
        );
    }

    #[test]
    fn test_white_is_compliant() {
        let result = LuminanceAnalyzer::default().analyze(&solid(32, 32, [255, 255, 255]));
        assert!(result.is_compliant());
        assert!((result.score() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_black_scores_zero() {
        let result = LuminanceAnalyzer::default().analyze(&solid(32, 32, [0, 0, 0]));
        assert!(!result.is_compliant());
        assert_eq!(result.score(), 0.0);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        // Black averages exactly 0.0, so a zero threshold must pass it
        let analyzer = LuminanceAnalyzer::new(LuminanceConfig {
            threshold: 0.0,
            ..LuminanceConfig::default()
        });
        assert!(analyzer.analyze(&solid(8, 8, [0, 0, 0])).is_compliant());
    }

    #[test]
    fn test_mean_equal_to_threshold_passes() {
        let analysis = LuminanceAnalysis {
            mean: 0.55,
            samples: 1,
        };
        assert!(analysis.meets(0.55));
        assert!(!LuminanceAnalysis { mean: 0.549, ..analysis }.meets(0.55));
    }

    #[test]
    fn test_sparse_grid_on_large_image() {
        let image = solid(2048, 1536, [10, 200, 30]);
        let analysis = LuminanceAnalysis::measure(&image, &GridPolicy::DEFAULT);
        // stride 3 on 2048x1536
        assert_eq!(analysis.samples, 683 * 512);
        let expected = ColorSample::from_rgb8([10, 200, 30]).luminance();
        assert!((analysis.mean - expected).abs() < 1e-9);
    }

    #[test]
    fn test_single_pixel_image() {
        let result = LuminanceAnalyzer::default().analyze(&solid(1, 1, [255, 255, 255]));
        assert!(result.is_compliant());
    }

    #[test]
    fn test_idempotent() {
        let image = solid(300, 200, [90, 140, 220]);
        let analyzer = LuminanceAnalyzer::default();
        assert_eq!(analyzer.analyze(&image), analyzer.analyze(&image));
    }
}
