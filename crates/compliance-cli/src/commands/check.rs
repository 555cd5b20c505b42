//! Check command - analyze shift photos for the compliance marker.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use compliance_adapters::upload::{DEFAULT_EXTENSIONS, DEFAULT_MAX_BYTES};
use compliance_adapters::{
    markers_dir, FsImageSource, HttpPredictionClient, LocalImageStore, UploadPolicy,
};
use compliance_core::modules::{
    ColorCoverageAnalyzer, ColorCoverageConfig, HueBand, LuminanceAnalyzer, LuminanceConfig,
    RemoteClassifierAnalyzer, RemoteClassifierConfig, TemplateMatchAnalyzer, TemplateMatchConfig,
};
use compliance_core::sampling::GridPolicy;
use compliance_core::{
    AnalyzerKind, BatchSummary, ComplianceEngine, ComplianceRecord, ImageHandle, ImageSource,
    ProgressEvent, ProgressSink, RecordOutcome, ResultOutput,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, ProgressBar};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per line)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
}

/// Hardcoded fallbacks used when neither CLI nor config sets a value.
mod defaults {
    use compliance_core::AnalyzerKind;

    pub const ANALYZER: AnalyzerKind = AnalyzerKind::ColorCoverage;
    pub const TIMEOUT_SECS: u64 = 30;
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// Parse and validate a threshold value (0.0-1.0).
fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

fn parse_analyzer(s: &str) -> Result<AnalyzerKind, String> {
    s.parse()
}

/// Shared arguments for image analysis.
#[derive(Args, Clone)]
pub struct CheckArgs {
    /// Files or directories to analyze
    pub paths: Vec<PathBuf>,

    /// Stored image references such as /uploads/P-0003.jpg (needs --upload-root)
    #[arg(long = "reference", value_name = "REF")]
    pub references: Vec<String>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Analyzer to run: luminance, color-coverage, template-match or remote
    #[arg(short, long, value_parser = parse_analyzer)]
    pub analyzer: Option<AnalyzerKind>,

    /// Brightness threshold for the luminance analyzer (0.0-1.0)
    #[arg(long, value_parser = parse_threshold)]
    pub threshold: Option<f32>,

    /// Directory holding green-check.png and red-x.png
    #[arg(long, value_name = "DIR")]
    pub marker_dir: Option<PathBuf>,

    /// Prediction endpoint for the remote analyzer
    #[arg(long, value_name = "URL", env = "SHIFT_COMPLIANCE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// API key for the prediction endpoint
    #[arg(
        long,
        value_name = "KEY",
        env = "SHIFT_COMPLIANCE_API_KEY",
        hide_env_values = true
    )]
    pub api_key: Option<String>,

    /// Remote request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Largest accepted file in bytes
    #[arg(long, value_name = "BYTES")]
    pub max_bytes: Option<u64>,

    /// Web root that --reference paths resolve under
    #[arg(long, value_name = "DIR")]
    pub upload_root: Option<PathBuf>,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: Option<AppConfig>,
}

impl CheckArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods and analyzer configs)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        if !args.recursive {
            args.recursive = config.general.recursive.unwrap_or(false);
        }

        // Unknown names were already reported by config validation
        if args.analyzer.is_none() {
            args.analyzer = config
                .engine
                .analyzer
                .as_deref()
                .and_then(|name| name.parse().ok());
        }

        args.threshold = args.threshold.or(config.luminance.threshold);
        args.timeout = args.timeout.or(config.remote.timeout_secs);
        args.max_bytes = args.max_bytes.or(config.general.max_bytes);

        if args.marker_dir.is_none() {
            args.marker_dir.clone_from(&config.template.marker_dir);
        }
        if args.endpoint.is_none() {
            args.endpoint.clone_from(&config.remote.endpoint);
        }
        if args.api_key.is_none() {
            args.api_key.clone_from(&config.remote.api_key);
        }
        if args.upload_root.is_none() {
            args.upload_root.clone_from(&config.engine.upload_root);
        }

        if args.format.is_none() {
            args.format = config
                .output
                .format
                .as_ref()
                .and_then(|s| match s.as_str() {
                    "json" => Some(OutputFormat::Json),
                    "jsonl" => Some(OutputFormat::Jsonl),
                    _ => None,
                });
        }

        if !args.pretty {
            args.pretty = config.output.pretty.unwrap_or(false);
        }
        if !args.progress {
            args.progress = config.output.progress.unwrap_or(false);
        }

        // Kept for the analyzer-specific settings that have no CLI flag
        args.config = Some(config.clone());

        args
    }

    /// Get the analyzer with fallback to color coverage.
    fn analyzer(&self) -> AnalyzerKind {
        self.analyzer.unwrap_or(defaults::ANALYZER)
    }

    /// Get the remote timeout with fallback to the hardcoded default.
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(defaults::TIMEOUT_SECS))
    }

    /// Get output format with fallback to JSONL.
    fn format(&self) -> OutputFormat {
        self.format.unwrap_or(OutputFormat::Jsonl)
    }

    /// Whether any path or stored reference was given.
    pub fn has_inputs(&self) -> bool {
        !self.paths.is_empty() || !self.references.is_empty()
    }
}

/// Result of running the check command.
pub struct CheckResult {
    /// Per-outcome counts.
    pub summary: BatchSummary,
    /// Whether Ctrl-C stopped the batch early.
    pub interrupted: bool,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Run the check command.
///
/// Expects `args` to have been processed through `with_config()` first
/// to apply configuration file settings.
pub async fn run(args: &CheckArgs) -> Result<CheckResult> {
    info!(
        "Running check command on {} paths and {} references",
        args.paths.len(),
        args.references.len()
    );

    if !args.has_inputs() {
        anyhow::bail!("No paths specified");
    }
    if !args.references.is_empty() && args.upload_root.is_none() {
        anyhow::bail!("--reference needs --upload-root (or engine.upload_root in config)");
    }

    let engine = build_engine(args)?;

    let source =
        FsImageSource::with_policy(args.paths.clone(), args.recursive, upload_policy(args));
    let total = source.count_hint().map(|n| n + args.references.len());

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress_bar = ProgressBar::new(total.map(|t| t as u64), args.quiet, show_progress);

    let output = JsonOutput::stdout();

    let cancel = CancellationToken::new();
    let watcher = spawn_interrupt_watcher(cancel.clone());

    let result = process_images(&engine, &source, &output, &progress_bar, args, &cancel).await;
    watcher.abort();
    result
}

/// Cancels `cancel` on the first Ctrl-C.
fn spawn_interrupt_watcher(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, cancelling analysis");
                cancel.cancel();
            }
            Err(e) => debug!("Ctrl-C handler unavailable: {e}"),
        }
    })
}

fn upload_policy(args: &CheckArgs) -> UploadPolicy {
    let max_bytes = args.max_bytes.unwrap_or(DEFAULT_MAX_BYTES);
    match args.config.as_ref().and_then(|c| c.general.extensions.as_ref()) {
        Some(extensions) => UploadPolicy::new(extensions, max_bytes),
        None => UploadPolicy::new(DEFAULT_EXTENSIONS, max_bytes),
    }
}

/// Rejects a zero size named by config `key`.
fn positive(key: &str, value: u32) -> Result<u32> {
    if value == 0 {
        anyhow::bail!("{key} must be positive");
    }
    Ok(value)
}

/// Build the engine for the selected analyzer from merged args (CLI + config).
fn build_engine(args: &CheckArgs) -> Result<ComplianceEngine> {
    let config = args.config.clone().unwrap_or_default();

    let engine = match args.analyzer() {
        AnalyzerKind::Luminance => {
            let mut analyzer_config = LuminanceConfig::default();
            if let Some(threshold) = args.threshold {
                analyzer_config.threshold = threshold;
            }
            if let Some(target_samples) = config.luminance.target_samples {
                analyzer_config.grid = GridPolicy { target_samples };
            }
            ComplianceEngine::new(LuminanceAnalyzer::new(analyzer_config))
        }
        AnalyzerKind::ColorCoverage => {
            let section = &config.color_coverage;
            let mut analyzer_config = ColorCoverageConfig::default();
            if let Some(v) = section.value_floor {
                analyzer_config.value_floor = v;
            }
            if let Some(s) = section.saturation_floor {
                analyzer_config.saturation_floor = s;
            }
            if let Some([start, end]) = section.red_band {
                analyzer_config.red_band = HueBand::new(start, end);
            }
            if let Some([start, end]) = section.green_band {
                analyzer_config.green_band = HueBand::new(start, end);
            }
            if let Some(size) = section.normalize_size {
                analyzer_config.normalize_size = positive("color_coverage.normalize_size", size)?;
            }
            if let Some(side) = section.min_corner_side {
                analyzer_config.corners.min_side = side;
            }
            ComplianceEngine::new(ColorCoverageAnalyzer::new(analyzer_config))
        }
        AnalyzerKind::TemplateMatch => {
            let dir = markers_dir(args.marker_dir.as_deref());
            debug!("Using marker directory: {}", dir.display());
            let mut analyzer_config = TemplateMatchConfig::with_marker_dir(&dir);
            if let Some(size) = config.template.match_size {
                analyzer_config.match_size = positive("template.match_size", size)?;
            }
            if let Some(side) = config.template.max_corner_side {
                analyzer_config.corners.max_side = side;
            }
            let analyzer = TemplateMatchAnalyzer::load(analyzer_config).context(
                "Template matching needs both markers. Run `shift-compliance markers list`.",
            )?;
            ComplianceEngine::new(analyzer)
        }
        AnalyzerKind::Remote => {
            let endpoint = args
                .endpoint
                .as_deref()
                .context("The remote analyzer needs --endpoint or SHIFT_COMPLIANCE_ENDPOINT")?;
            let api_key = args
                .api_key
                .as_deref()
                .context("The remote analyzer needs --api-key or SHIFT_COMPLIANCE_API_KEY")?;
            let client = HttpPredictionClient::new(
                endpoint,
                api_key,
                Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS),
            )
            .context("Failed to build HTTP client")?;

            let fallback = RemoteClassifierConfig::default();
            let analyzer_config = RemoteClassifierConfig {
                compliant_label: config
                    .remote
                    .compliant_label
                    .clone()
                    .unwrap_or(fallback.compliant_label),
                request_timeout: args.timeout(),
                max_in_flight: config.remote.max_in_flight.unwrap_or(fallback.max_in_flight),
            };
            ComplianceEngine::new(RemoteClassifierAnalyzer::new(
                Arc::new(client),
                analyzer_config,
            ))
        }
    };

    Ok(match args.upload_root {
        Some(ref root) => {
            debug!("Resolving references under {}", root.display());
            engine.with_store(Arc::new(LocalImageStore::new(root.clone())))
        }
        None => engine,
    })
}

/// Analyze every accepted image, writing one record per image.
async fn process_images(
    engine: &ComplianceEngine,
    source: &dyn ImageSource,
    output: &dyn ResultOutput,
    progress: &dyn ProgressSink,
    args: &CheckArgs,
    cancel: &CancellationToken,
) -> Result<CheckResult> {
    let total = source.count_hint().map(|n| n + args.references.len());
    let mut summary = BatchSummary::default();
    let mut all_records: Vec<ComplianceRecord> = Vec::new();

    let stored = args
        .references
        .iter()
        .map(|reference| Ok::<_, anyhow::Error>(ImageHandle::Stored(reference.clone())));

    for (index, item) in source.handles().chain(stored).enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        let handle = match item {
            Ok(handle) => handle,
            Err(e) => {
                // The error chain names the offending path
                progress.on_event(ProgressEvent::Skipped {
                    path: format!("entry {index}"),
                    reason: format!("{e:#}"),
                });
                summary.skipped += 1;
                continue;
            }
        };

        let path = handle.location();

        progress.on_event(ProgressEvent::Started {
            path: path.clone(),
            index,
            total,
        });

        let outcome = match engine.analyze(handle, cancel).await {
            Ok(result) => RecordOutcome::from(result),
            Err(e) => {
                warn!("Analysis failed for {path}: {e}");
                RecordOutcome::from(&e)
            }
        };

        let record = ComplianceRecord {
            path,
            timestamp: iso_timestamp(),
            analyzer: engine.analyzer_name().to_string(),
            outcome,
        };
        summary.record(&record);

        progress.on_event(ProgressEvent::Completed {
            record: record.clone(),
        });

        match args.format() {
            OutputFormat::Jsonl => {
                output.write(&record)?;
            }
            OutputFormat::Json => {
                all_records.push(record);
            }
        }
    }

    if matches!(args.format(), OutputFormat::Json) {
        output.write_batch(&all_records, args.pretty)?;
    }

    output.flush()?;

    let interrupted = cancel.is_cancelled();
    if interrupted {
        warn!("Batch interrupted, remaining images were not analyzed");
    }

    progress.on_event(ProgressEvent::Finished(summary));

    Ok(CheckResult {
        summary,
        interrupted,
        exit_code: exit_code_for(&summary, interrupted),
    })
}

/// Failures outrank non-compliance: a batch with an unanswered image is not
/// reported as merely non-compliant.
const fn exit_code_for(summary: &BatchSummary, interrupted: bool) -> ExitCode {
    if interrupted || summary.failed > 0 {
        ExitCode::Error
    } else if summary.non_compliant > 0 {
        ExitCode::NonCompliant
    } else {
        ExitCode::Success
    }
}

/// Generate ISO 8601 UTC timestamp (RFC 3339 format).
fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}
