//! Configuration file support for shift-compliance.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/shift-compliance/config.toml` (lowest priority)
//! - Project-local: `.shift-compliance.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

/// File name of the project-local config.
pub const PROJECT_CONFIG_FILE: &str = ".shift-compliance.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General options.
    pub general: GeneralConfig,
    /// Analyzer selection and image store.
    pub engine: EngineConfig,
    /// Luminance analyzer settings.
    pub luminance: LuminanceSection,
    /// Color coverage analyzer settings.
    pub color_coverage: ColorCoverageSection,
    /// Template match analyzer settings.
    pub template: TemplateSection,
    /// Remote classifier settings.
    pub remote: RemoteSection,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// General configuration options.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
    /// Accepted file extensions.
    pub extensions: Option<Vec<String>>,
    /// Largest accepted file, in bytes.
    pub max_bytes: Option<u64>,
}

/// Engine configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Analyzer name: "luminance", "color_coverage", "template_match" or "remote".
    pub analyzer: Option<String>,
    /// Web root that stored references such as `/uploads/a.jpg` resolve under.
    pub upload_root: Option<PathBuf>,
}

/// Luminance analyzer configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LuminanceSection {
    /// Brightness threshold (0.0-1.0).
    pub threshold: Option<f32>,
    /// Samples per axis on the shorter side.
    pub target_samples: Option<u32>,
}

/// Color coverage analyzer configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ColorCoverageSection {
    /// Minimum HSV value for a pixel to count.
    pub value_floor: Option<f64>,
    /// Minimum HSV saturation for a pixel to count.
    pub saturation_floor: Option<f64>,
    /// Red hue band as `[start, end]` degrees.
    pub red_band: Option<[f64; 2]>,
    /// Green hue band as `[start, end]` degrees.
    pub green_band: Option<[f64; 2]>,
    /// Side length corners are resampled to.
    pub normalize_size: Option<u32>,
    /// Smallest corner side in pixels.
    pub min_corner_side: Option<u32>,
}

/// Template match analyzer configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateSection {
    /// Directory holding `green-check.png` and `red-x.png`.
    pub marker_dir: Option<PathBuf>,
    /// Side length regions and markers are compared at.
    pub match_size: Option<u32>,
    /// Largest corner side in pixels.
    pub max_corner_side: Option<u32>,
}

/// Remote classifier configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    /// Prediction endpoint URL.
    pub endpoint: Option<String>,
    /// API key sent in the `Prediction-Key` header.
    pub api_key: Option<String>,
    /// Label meaning compliant.
    pub compliant_label: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Maximum concurrent requests.
    pub max_in_flight: Option<usize>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/shift-compliance/config.toml`
    /// 2. Project-local: `.shift-compliance.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        for problem in config.validate() {
            eprintln!("warning: {problem}");
        }

        config
    }

    /// Checks values are within acceptable ranges, returning one message per problem.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let unit = |name: &str, value: Option<f64>, problems: &mut Vec<String>| {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    problems.push(format!("{name} must be 0.0-1.0, got {v}"));
                }
            }
        };
        unit(
            "luminance.threshold",
            self.luminance.threshold.map(f64::from),
            &mut problems,
        );
        unit(
            "color_coverage.value_floor",
            self.color_coverage.value_floor,
            &mut problems,
        );
        unit(
            "color_coverage.saturation_floor",
            self.color_coverage.saturation_floor,
            &mut problems,
        );

        for (name, band) in [
            ("color_coverage.red_band", self.color_coverage.red_band),
            ("color_coverage.green_band", self.color_coverage.green_band),
        ] {
            if let Some([start, end]) = band {
                if !(0.0..360.0).contains(&start) || !(0.0..360.0).contains(&end) {
                    problems.push(format!(
                        "{name} hues must be in 0-360, got [{start}, {end}]"
                    ));
                }
            }
        }

        for (name, value) in [
            ("luminance.target_samples", self.luminance.target_samples),
            (
                "color_coverage.normalize_size",
                self.color_coverage.normalize_size,
            ),
            ("template.match_size", self.template.match_size),
            ("template.max_corner_side", self.template.max_corner_side),
        ] {
            if value == Some(0) {
                problems.push(format!("{name} must be positive"));
            }
        }
        if self.remote.timeout_secs == Some(0) {
            problems.push("remote.timeout_secs must be positive".to_string());
        }
        if self.remote.max_in_flight == Some(0) {
            problems.push("remote.max_in_flight must be positive".to_string());
        }
        if self.general.max_bytes == Some(0) {
            problems.push("general.max_bytes must be positive".to_string());
        }

        if let Some(ref name) = self.engine.analyzer {
            if let Err(e) = name.parse::<compliance_core::AnalyzerKind>() {
                problems.push(format!("engine.analyzer: {e}"));
            }
        }

        if let Some(ref f) = self.output.format {
            if f != "json" && f != "jsonl" {
                problems.push(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'"
                ));
            }
        }

        problems
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        // General
        self.general.recursive = other.general.recursive.or(self.general.recursive);
        self.general.extensions = other
            .general
            .extensions
            .or_else(|| self.general.extensions.take());
        self.general.max_bytes = other.general.max_bytes.or(self.general.max_bytes);

        // Engine
        self.engine.analyzer = other.engine.analyzer.or_else(|| self.engine.analyzer.take());
        self.engine.upload_root = other
            .engine
            .upload_root
            .or_else(|| self.engine.upload_root.take());

        // Luminance
        self.luminance.threshold = other.luminance.threshold.or(self.luminance.threshold);
        self.luminance.target_samples = other
            .luminance
            .target_samples
            .or(self.luminance.target_samples);

        // Color coverage
        let (base, over) = (&mut self.color_coverage, other.color_coverage);
        base.value_floor = over.value_floor.or(base.value_floor);
        base.saturation_floor = over.saturation_floor.or(base.saturation_floor);
        base.red_band = over.red_band.or(base.red_band);
        base.green_band = over.green_band.or(base.green_band);
        base.normalize_size = over.normalize_size.or(base.normalize_size);
        base.min_corner_side = over.min_corner_side.or(base.min_corner_side);

        // Template
        self.template.marker_dir = other
            .template
            .marker_dir
            .or_else(|| self.template.marker_dir.take());
        self.template.match_size = other.template.match_size.or(self.template.match_size);
        self.template.max_corner_side = other
            .template
            .max_corner_side
            .or(self.template.max_corner_side);

        // Remote
        let (base, over) = (&mut self.remote, other.remote);
        base.endpoint = over.endpoint.or_else(|| base.endpoint.take());
        base.api_key = over.api_key.or_else(|| base.api_key.take());
        base.compliant_label = over.compliant_label.or_else(|| base.compliant_label.take());
        base.timeout_secs = over.timeout_secs.or(base.timeout_secs);
        base.max_in_flight = over.max_in_flight.or(base.max_in_flight);

        // Output
        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("shift-compliance").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.shift-compliance.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(PROJECT_CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
