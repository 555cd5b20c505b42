//! Color coverage analyzer.
//!
//! Detects a red "X" or green "check" marker by counting strongly colored
//! pixels inside the four corner regions. Only corners are inspected, so busy
//! backgrounds in the middle of the photo do not matter.

use std::ops::Add;

use crate::color::{ColorSample, HsvSample};
use crate::domain::{ComplianceResult, ImageAnalyzer, RasterImage};
use crate::sampling::{CornerPolicy, Region, RegionSampler};

/// An inclusive hue interval in degrees. Wraps through 0 when `start > end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueBand {
    /// First hue in the band.
    pub start: f64,
    /// Last hue in the band.
    pub end: f64,
}

impl HueBand {
    /// Red: `hue <= 15` or `hue >= 345`.
    pub const RED: Self = Self::new(345.0, 15.0);
    /// Green: `85 <= hue <= 150`.
    pub const GREEN: Self = Self::new(85.0, 150.0);

    /// Creates a band.
    #[must_use]
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Whether `hue` falls inside the band.
    #[must_use]
    pub fn contains(&self, hue: f64) -> bool {
        if self.start <= self.end {
            (self.start..=self.end).contains(&hue)
        } else {
            hue >= self.start || hue <= self.end
        }
    }
}

/// Configuration for color coverage analysis.
#[derive(Debug, Clone)]
pub struct ColorCoverageConfig {
    /// Corner region sizing.
    pub corners: CornerPolicy,
    /// Every corner is resampled to `normalize_size`×`normalize_size` before counting.
    pub normalize_size: u32,
    /// Pixels darker than this HSV value are ignored.
    pub value_floor: f64,
    /// Pixels less saturated than this are ignored.
    pub saturation_floor: f64,
    /// Hue band counted as red (non-compliant marker).
    pub red_band: HueBand,
    /// Hue band counted as green (compliant marker).
    pub green_band: HueBand,
}

impl Default for ColorCoverageConfig {
    fn default() -> Self {
        Self {
            corners: CornerPolicy::COVERAGE,
            normalize_size: 128,
            value_floor: 0.25,
            saturation_floor: 0.35,
            red_band: HueBand::RED,
            green_band: HueBand::GREEN,
        }
    }
}

/// Pixel counts for one or more regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageTally {
    /// Pixels classified red.
    pub red: u64,
    /// Pixels classified green.
    pub green: u64,
    /// All pixels inspected, including ignored ones.
    pub sampled: u64,
}

impl Add for CoverageTally {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            red: self.red + other.red,
            green: self.green + other.green,
            sampled: self.sampled + other.sampled,
        }
    }
}

/// Summed per-region coverage fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageAnalysis {
    /// Sum over regions of the red fraction.
    pub red: f64,
    /// Sum over regions of the green fraction.
    pub green: f64,
}

impl CoverageAnalysis {
    /// Compliant when green coverage is at least red coverage; ties are compliant.
    #[must_use]
    pub fn verdict(&self) -> ComplianceResult {
        ComplianceResult::new(self.green >= self.red, self.green.max(self.red))
    }
}

/// Red/green corner coverage analyzer.
pub struct ColorCoverageAnalyzer {
    config: ColorCoverageConfig,
}

impl ColorCoverageAnalyzer {
    /// Creates a new color coverage analyzer with the given configuration.
    ///
    /// A `normalize_size` of 0 is raised to 1.
    #[must_use]
    pub fn new(mut config: ColorCoverageConfig) -> Self {
        config.normalize_size = config.normalize_size.max(1);
        Self { config }
    }

    /// Returns the analyzer configuration.
    #[must_use]
    pub const fn config(&self) -> &ColorCoverageConfig {
        &self.config
    }

    /// Counts red, green and inspected pixels in one normalized region.
    #[must_use]
    pub fn tally_region(&self, image: &RasterImage, region: Region) -> CoverageTally {
        if region.clipped(image.width(), image.height()).is_empty() {
            return CoverageTally::default();
        }
        let normalized = image.crop_resized(region, self.config.normalize_size);

        normalized
            .pixels()
            .map(|pixel| self.classify(ColorSample::from_rgb8(pixel.0).to_hsv()))
            .fold(CoverageTally::default(), Add::add)
    }

    /// Sums coverage fractions over `regions`.
    ///
    /// Every region is normalized to the same size, so the sum of per-region
    /// fractions is the summed counts over one shared denominator. Integer
    /// counts make the result independent of region order.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn measure_regions(&self, image: &RasterImage, regions: &[Region]) -> CoverageAnalysis {
        let tally = regions
            .iter()
            .map(|&region| self.tally_region(image, region))
            .fold(CoverageTally::default(), Add::add);

        let per_region = u64::from(self.config.normalize_size).pow(2);
        if per_region == 0 || tally.sampled == 0 {
            return CoverageAnalysis {
                red: 0.0,
                green: 0.0,
            };
        }
        CoverageAnalysis {
            red: tally.red as f64 / per_region as f64,
            green: tally.green as f64 / per_region as f64,
        }
    }

    /// Coverage over the four corner regions.
    #[must_use]
    pub fn measure(&self, image: &RasterImage) -> CoverageAnalysis {
        let (width, height) = image.dimensions();
        let regions: Vec<Region> = RegionSampler::corners(&self.config.corners, width, height)
            .into_iter()
            .map(|(_, region)| region)
            .collect();
        self.measure_regions(image, &regions)
    }

    fn classify(&self, hsv: HsvSample) -> CoverageTally {
        let mut tally = CoverageTally {
            sampled: 1,
            ..CoverageTally::default()
        };
        if hsv.value < self.config.value_floor || hsv.saturation < self.config.saturation_floor {
            return tally;
        }
        if self.config.red_band.contains(hsv.hue) {
            tally.red = 1;
        }
        if self.config.green_band.contains(hsv.hue) {
            tally.green = 1;
        }
        tally
    }
}

impl Default for ColorCoverageAnalyzer {
    fn default() -> Self {
        Self::new(ColorCoverageConfig::default())
    }
}

impl ImageAnalyzer for ColorCoverageAnalyzer {
    fn name(&self) -> &'static str {
        "color_coverage"
    }

    fn analyze(&self, image: &RasterImage) -> ComplianceResult {
        self.measure(image).verdict()
    }
}
