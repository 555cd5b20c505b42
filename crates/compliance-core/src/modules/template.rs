//! Template-match analyzer.
//!
//! Compares each corner of the photo against two reference markers, a green
//! check (pass) and a red X (fail), and keeps the best similarity seen for
//! each. References are loaded once and shared read-only across analyses.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::color::{rgb8_distance, similarity};
use crate::domain::{resample_square, AnalysisError, ComplianceResult, ImageAnalyzer, RasterImage};
use crate::sampling::{CornerPolicy, RegionSampler};

/// Default pass marker file name inside the marker directory.
pub const PASS_MARKER_FILE: &str = "green-check.png";
/// Default fail marker file name inside the marker directory.
pub const FAIL_MARKER_FILE: &str = "red-x.png";

/// The pair of reference markers, already resampled to the comparison size.
#[derive(Debug, Clone)]
pub struct MarkerReferences {
    pass: RgbImage,
    fail: RgbImage,
}

impl MarkerReferences {
    /// Builds references from decoded images, resampling both to `size`×`size`.
    /// A `size` of 0 is raised to 1.
    #[must_use]
    pub fn from_images(pass: &DynamicImage, fail: &DynamicImage, size: u32) -> Self {
        let size = size.max(1);
        Self {
            pass: resample_square(&pass.to_rgb8(), size),
            fail: resample_square(&fail.to_rgb8(), size),
        }
    }

    /// Loads both markers from disk.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ReferenceAssetMissing`] naming the first
    /// marker that is missing or cannot be decoded.
    pub fn load(pass: &Path, fail: &Path, size: u32) -> Result<Self, AnalysisError> {
        let pass_image = open_marker(pass)?;
        let fail_image = open_marker(fail)?;
        debug!(pass = %pass.display(), fail = %fail.display(), size, "Loaded reference markers");
        Ok(Self::from_images(&pass_image, &fail_image, size))
    }

    /// The resampled pass marker.
    #[must_use]
    pub const fn pass(&self) -> &RgbImage {
        &self.pass
    }

    /// The resampled fail marker.
    #[must_use]
    pub const fn fail(&self) -> &RgbImage {
        &self.fail
    }
}

fn open_marker(path: &Path) -> Result<DynamicImage, AnalysisError> {
    image::open(path).map_err(|source| AnalysisError::ReferenceAssetMissing {
        path: path.to_path_buf(),
        source,
    })
}

/// Configuration for template matching.
#[derive(Debug, Clone)]
pub struct TemplateMatchConfig {
    /// Corner region sizing.
    pub corners: CornerPolicy,
    /// Side length both regions and markers are resampled to.
    pub match_size: u32,
    /// Path of the pass (green check) marker.
    pub pass_marker: PathBuf,
    /// Path of the fail (red X) marker.
    pub fail_marker: PathBuf,
}

impl TemplateMatchConfig {
    /// Default configuration with both markers inside `dir`.
    #[must_use]
    pub fn with_marker_dir(dir: &Path) -> Self {
        Self {
            pass_marker: dir.join(PASS_MARKER_FILE),
            fail_marker: dir.join(FAIL_MARKER_FILE),
            ..Self::default()
        }
    }
}

impl Default for TemplateMatchConfig {
    fn default() -> Self {
        Self {
            corners: CornerPolicy::TEMPLATE,
            match_size: 64,
            pass_marker: PathBuf::from("markers").join(PASS_MARKER_FILE),
            fail_marker: PathBuf::from("markers").join(FAIL_MARKER_FILE),
        }
    }
}

/// Best similarity of the photo's corners to each marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatch {
    /// Best similarity to the pass marker.
    pub pass: f64,
    /// Best similarity to the fail marker.
    pub fail: f64,
}

impl TemplateMatch {
    /// Pass wins ties.
    #[must_use]
    pub fn verdict(&self) -> ComplianceResult {
        ComplianceResult::new(self.pass >= self.fail, self.pass.max(self.fail))
    }
}

/// Mean per-pixel color similarity of two equally sized images.
///
/// Returns 0.0 when the sizes differ or the images are empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_similarity(a: &RgbImage, b: &RgbImage) -> f64 {
    if a.dimensions() != b.dimensions() {
        return 0.0;
    }
    let count = u64::from(a.width()) * u64::from(a.height());
    if count == 0 {
        return 0.0;
    }
    let total_distance: f64 = a
        .pixels()
        .zip(b.pixels())
        .map(|(pa, pb)| rgb8_distance(pa.0, pb.0))
        .sum();
    similarity(total_distance / count as f64)
}

/// Marker template-match analyzer.
pub struct TemplateMatchAnalyzer {
    config: TemplateMatchConfig,
    references: Arc<MarkerReferences>,
}

impl TemplateMatchAnalyzer {
    /// Creates an analyzer from already-loaded references.
    ///
    /// Regions are resampled to the references' side, which overrides
    /// `config.match_size` when the two disagree.
    #[must_use]
    pub fn new(mut config: TemplateMatchConfig, references: Arc<MarkerReferences>) -> Self {
        config.match_size = references.pass().width().max(1);
        Self { config, references }
    }

    /// Loads the markers named in `config` and builds the analyzer.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ReferenceAssetMissing`] if either marker is
    /// missing or unreadable.
    pub fn load(config: TemplateMatchConfig) -> Result<Self, AnalysisError> {
        let references =
            MarkerReferences::load(&config.pass_marker, &config.fail_marker, config.match_size)?;
        Ok(Self::new(config, Arc::new(references)))
    }

    /// Returns the analyzer configuration.
    #[must_use]
    pub const fn config(&self) -> &TemplateMatchConfig {
        &self.config
    }

    /// Best pass and fail similarity over all corners.
    #[must_use]
    pub fn measure(&self, image: &RasterImage) -> TemplateMatch {
        let (width, height) = image.dimensions();
        RegionSampler::corners(&self.config.corners, width, height)
            .into_iter()
            .map(|(_, region)| image.crop_resized(region, self.config.match_size))
            .fold(
                TemplateMatch {
                    pass: 0.0,
                    fail: 0.0,
                },
                |best, region| TemplateMatch {
                    pass: best
                        .pass
                        .max(mean_similarity(&region, self.references.pass())),
                    fail: best
                        .fail
                        .max(mean_similarity(&region, self.references.fail())),
                },
            )
    }
}

impl ImageAnalyzer for TemplateMatchAnalyzer {
    fn name(&self) -> &'static str {
        "template_match"
    }

    fn analyze(&self, image: &RasterImage) -> ComplianceResult {
        self.measure(image).verdict()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use image::Rgb;

    const GREEN: [u8; 3] = [30, 180, 60];
    const RED: [u8; 3] = [210, 30, 30];
    const BACKGROUND: [u8; 3] = [128, 128, 128];

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(rgb))
    }

    fn references() -> Arc<MarkerReferences> {
        Arc::new(MarkerReferences::from_images(
            &DynamicImage::ImageRgb8(solid(32, 32, GREEN)),
            &DynamicImage::ImageRgb8(solid(32, 32, RED)),
            64,
        ))
    }

    fn analyzer() -> TemplateMatchAnalyzer {
        TemplateMatchAnalyzer::new(TemplateMatchConfig::default(), references())
    }

    /// Gray photo with a `side`×`side` marker in the bottom-right corner.
    fn photo_with_marker(size: u32, side: u32, marker: [u8; 3]) -> RasterImage {
        let img = RgbImage::from_fn(size, size, |x, y| {
            if x >= size - side && y >= size - side {
                Rgb(marker)
            } else {
                Rgb(BACKGROUND)
            }
        });
        RasterImage::from_dynamic(DynamicImage::ImageRgb8(img))
    }

    #[test]
    fn test_default_config() {
        let config = TemplateMatchConfig::default();
        assert_eq!(config.match_size, 64);
        assert_eq!(config.corners, CornerPolicy::TEMPLATE);
        assert!(config.pass_marker.ends_with("green-check.png"));
        assert!(config.fail_marker.ends_with("red-x.png"));
    }

    #[test]
    fn test_marker_dir() {
        let config = TemplateMatchConfig::with_marker_dir(Path::new("/opt/markers"));
        assert_eq!(config.pass_marker, PathBuf::from("/opt/markers/green-check.png"));
        assert_eq!(config.fail_marker, PathBuf::from("/opt/markers/red-x.png"));
    }

    #[test]
    fn test_analyzer_name() {
        assert_eq!(analyzer().name(), "template_match");
    }

    #[test]
    fn test_references_resampled() {
        let refs = references();
        assert_eq!(refs.pass().dimensions(), (64, 64));
        assert_eq!(refs.fail().dimensions(), (64, 64));
    }

    #[test]
    fn test_mean_similarity_identical_and_opposite() {
        let white = solid(8, 8, [255, 255, 255]);
        let black = solid(8, 8, [0, 0, 0]);
        assert_eq!(mean_similarity(&white, &white), 1.0);
        assert_eq!(mean_similarity(&white, &black), 0.0);
        assert_eq!(mean_similarity(&white, &solid(4, 4, [255, 255, 255])), 0.0);
    }

    #[test]
    fn test_green_marker_is_compliant() {
        let result = analyzer().analyze(&photo_with_marker(600, 120, GREEN));
        assert!(result.is_compliant());
        assert!(result.score() > 0.99, "score {}", result.score());
    }

    #[test]
    fn test_red_marker_is_not_compliant() {
        let result = analyzer().analyze(&photo_with_marker(600, 120, RED));
        assert!(!result.is_compliant());
        assert!(result.score() > 0.99, "score {}", result.score());
    }

    #[test]
    fn test_identical_markers_tie_to_compliant() {
        let refs = Arc::new(MarkerReferences::from_images(
            &DynamicImage::ImageRgb8(solid(16, 16, GREEN)),
            &DynamicImage::ImageRgb8(solid(16, 16, GREEN)),
            64,
        ));
        let analyzer = TemplateMatchAnalyzer::new(TemplateMatchConfig::default(), refs);
        let matched = analyzer.measure(&photo_with_marker(300, 120, RED));
        assert_eq!(matched.pass, matched.fail);
        assert!(matched.verdict().is_compliant());
    }

    #[test]
    fn test_zero_match_size_still_sees_red() {
        let refs = Arc::new(MarkerReferences::from_images(
            &DynamicImage::ImageRgb8(solid(32, 32, GREEN)),
            &DynamicImage::ImageRgb8(solid(32, 32, [255, 0, 0])),
            0,
        ));
        let config = TemplateMatchConfig {
            match_size: 0,
            ..TemplateMatchConfig::default()
        };
        let analyzer = TemplateMatchAnalyzer::new(config, refs);
        assert_eq!(analyzer.config().match_size, 1);

        let image = DynamicImage::ImageRgb8(solid(200, 200, [255, 0, 0]));
        let result = analyzer.analyze(&RasterImage::from_dynamic(image));
        assert!(!result.is_compliant());
        assert!(result.score() > 0.99, "score {}", result.score());
    }

    #[test]
    fn test_image_smaller_than_corner() {
        let image = RasterImage::from_dynamic(DynamicImage::ImageRgb8(solid(40, 30, GREEN)));
        let result = analyzer().analyze(&image);
        assert!(result.is_compliant());
        assert!(result.score() > 0.99);
    }

    #[test]
    fn test_missing_marker_reported() {
        let config = TemplateMatchConfig::with_marker_dir(Path::new("/nonexistent/markers"));
        let err = TemplateMatchAnalyzer::load(config)
            .err()
            .expect("missing markers must fail");
        match err {
            AnalysisError::ReferenceAssetMissing { path, .. } => {
                assert!(path.ends_with("green-check.png"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_load_from_disk() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = temp.path();
        solid(20, 20, GREEN)
            .save(dir.join(PASS_MARKER_FILE))
            .expect("save pass");
        solid(20, 20, RED)
            .save(dir.join(FAIL_MARKER_FILE))
            .expect("save fail");

        let analyzer =
            TemplateMatchAnalyzer::load(TemplateMatchConfig::with_marker_dir(dir)).expect("load");
        assert!(analyzer
            .analyze(&photo_with_marker(400, 120, GREEN))
            .is_compliant());
    }

    #[test]
    fn test_idempotent() {
        let image = photo_with_marker(500, 80, RED);
        let analyzer = analyzer();
        assert_eq!(analyzer.analyze(&image), analyzer.analyze(&image));
    }
}
