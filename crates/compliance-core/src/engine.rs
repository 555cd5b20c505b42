//! The compliance engine.
//!
//! Binds exactly one analyzer variant, resolves image handles to bytes, and
//! maps every failure into [`AnalysisError`]. Local analyzers run on the
//! blocking pool; the remote analyzer is awaited directly. Both paths observe
//! the caller's [`CancellationToken`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use image::error::{ImageFormatHint, UnsupportedError, UnsupportedErrorKind};
use image::ImageError;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{AnalysisError, ComplianceResult, ImageAnalyzer, ImageHandle, RasterImage};
use crate::modules::{
    ColorCoverageAnalyzer, LuminanceAnalyzer, RemoteClassifierAnalyzer, TemplateMatchAnalyzer,
};
use crate::ports::{ImageStore, PredictionRequest};

/// Names the analyzer variant to bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    /// Average brightness threshold.
    Luminance,
    /// Red/green corner pixel coverage.
    ColorCoverage,
    /// Corner comparison against reference markers.
    TemplateMatch,
    /// External prediction service.
    Remote,
}

impl AnalyzerKind {
    /// All variants.
    pub const ALL: [Self; 4] = [
        Self::Luminance,
        Self::ColorCoverage,
        Self::TemplateMatch,
        Self::Remote,
    ];

    /// Stable snake_case name, also used in output records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Luminance => "luminance",
            Self::ColorCoverage => "color_coverage",
            Self::TemplateMatch => "template_match",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyzerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown analyzer '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

/// The pixel-based analyzer variants.
pub enum LocalAnalyzer {
    /// See [`LuminanceAnalyzer`].
    Luminance(LuminanceAnalyzer),
    /// See [`ColorCoverageAnalyzer`].
    ColorCoverage(ColorCoverageAnalyzer),
    /// See [`TemplateMatchAnalyzer`].
    TemplateMatch(TemplateMatchAnalyzer),
}

impl LocalAnalyzer {
    /// The variant's kind.
    #[must_use]
    pub const fn kind(&self) -> AnalyzerKind {
        match self {
            Self::Luminance(_) => AnalyzerKind::Luminance,
            Self::ColorCoverage(_) => AnalyzerKind::ColorCoverage,
            Self::TemplateMatch(_) => AnalyzerKind::TemplateMatch,
        }
    }
}

impl ImageAnalyzer for LocalAnalyzer {
    fn name(&self) -> &'static str {
        match self {
            Self::Luminance(a) => a.name(),
            Self::ColorCoverage(a) => a.name(),
            Self::TemplateMatch(a) => a.name(),
        }
    }

    fn analyze(&self, image: &RasterImage) -> ComplianceResult {
        match self {
            Self::Luminance(a) => a.analyze(image),
            Self::ColorCoverage(a) => a.analyze(image),
            Self::TemplateMatch(a) => a.analyze(image),
        }
    }
}

/// The single analyzer an engine is bound to.
pub enum Analyzer {
    /// CPU-bound analysis of decoded pixels.
    Local(Arc<LocalAnalyzer>),
    /// Network round trip to a prediction service.
    Remote(RemoteClassifierAnalyzer),
}

impl Analyzer {
    /// The variant's kind.
    #[must_use]
    pub fn kind(&self) -> AnalyzerKind {
        match self {
            Self::Local(local) => local.kind(),
            Self::Remote(_) => AnalyzerKind::Remote,
        }
    }

    /// Name reported in logs and output records.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Local(local) => local.name(),
            Self::Remote(remote) => remote.name(),
        }
    }
}

impl From<LocalAnalyzer> for Analyzer {
    fn from(local: LocalAnalyzer) -> Self {
        Self::Local(Arc::new(local))
    }
}

impl From<LuminanceAnalyzer> for Analyzer {
    fn from(analyzer: LuminanceAnalyzer) -> Self {
        LocalAnalyzer::Luminance(analyzer).into()
    }
}

impl From<ColorCoverageAnalyzer> for Analyzer {
    fn from(analyzer: ColorCoverageAnalyzer) -> Self {
        LocalAnalyzer::ColorCoverage(analyzer).into()
    }
}

impl From<TemplateMatchAnalyzer> for Analyzer {
    fn from(analyzer: TemplateMatchAnalyzer) -> Self {
        LocalAnalyzer::TemplateMatch(analyzer).into()
    }
}

impl From<RemoteClassifierAnalyzer> for Analyzer {
    fn from(analyzer: RemoteClassifierAnalyzer) -> Self {
        Self::Remote(analyzer)
    }
}

/// Entry point for compliance analysis.
pub struct ComplianceEngine {
    analyzer: Analyzer,
    store: Option<Arc<dyn ImageStore>>,
}

impl ComplianceEngine {
    /// Binds the engine to one analyzer.
    #[must_use]
    pub fn new(analyzer: impl Into<Analyzer>) -> Self {
        let analyzer = analyzer.into();
        info!(analyzer = analyzer.name(), "Compliance engine ready");
        Self {
            analyzer,
            store: None,
        }
    }

    /// Attaches the store used to resolve [`ImageHandle::Stored`] references.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Name of the bound analyzer.
    #[must_use]
    pub fn analyzer_name(&self) -> &'static str {
        self.analyzer.name()
    }

    /// Kind of the bound analyzer.
    #[must_use]
    pub fn analyzer_kind(&self) -> AnalyzerKind {
        self.analyzer.kind()
    }

    /// Analyzes one image.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::ImageUnreadable`] if the handle cannot be read
    /// - [`AnalysisError::ImageDecode`] if the bytes are not a supported image
    /// - [`AnalysisError::AnalysisUnavailable`] for remote failures
    /// - [`AnalysisError::Cancelled`] if `cancel` fires first
    pub async fn analyze(
        &self,
        handle: ImageHandle,
        cancel: &CancellationToken,
    ) -> Result<ComplianceResult, AnalysisError> {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let location = handle.location();

        let (file_name, bytes) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            read = self.read_source(handle) => read?,
        };
        debug!(image = %location, bytes = bytes.len(), "Read image");

        let result = match &self.analyzer {
            Analyzer::Local(local) => Self::run_local(Arc::clone(local), bytes, cancel).await?,
            Analyzer::Remote(remote) => {
                ensure_decodable(&bytes)?;
                remote
                    .classify(PredictionRequest { file_name, bytes }, cancel)
                    .await?
            }
        };

        debug!(
            image = %location,
            analyzer = self.analyzer.name(),
            is_compliant = result.is_compliant(),
            score = result.score(),
            "Analysis complete"
        );
        Ok(result)
    }

    async fn run_local(
        analyzer: Arc<LocalAnalyzer>,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<ComplianceResult, AnalysisError> {
        let task = tokio::task::spawn_blocking(move || {
            let image = RasterImage::decode(&bytes)?;
            Ok::<_, AnalysisError>(analyzer.analyze(&image))
        });

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AnalysisError::Cancelled),
            joined = task => match joined {
                Ok(result) => result,
                Err(e) => match e.try_into_panic() {
                    Ok(payload) => std::panic::resume_unwind(payload),
                    Err(e) => Err(AnalysisError::unavailable(e)),
                },
            },
        }
    }

    async fn read_source(&self, handle: ImageHandle) -> Result<(String, Vec<u8>), AnalysisError> {
        match handle {
            ImageHandle::Path(path) => {
                let bytes = tokio::fs::read(&path).await.map_err(|source| {
                    AnalysisError::ImageUnreadable {
                        location: path.display().to_string(),
                        source,
                    }
                })?;
                Ok((file_name_of(&path.to_string_lossy()), bytes))
            }
            ImageHandle::Bytes { name, data } => Ok((name, data)),
            ImageHandle::Stored(reference) => {
                let read = match &self.store {
                    Some(store) => store.read(&reference).await,
                    None => Err(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "no image store configured",
                    )),
                };
                let bytes = read.map_err(|source| AnalysisError::ImageUnreadable {
                    location: reference.clone(),
                    source,
                })?;
                Ok((file_name_of(&reference), bytes))
            }
        }
    }
}

/// Last path segment of a path or web reference.
fn file_name_of(location: &str) -> String {
    Path::new(location)
        .file_name()
        .map_or_else(|| location.to_string(), |n| n.to_string_lossy().into_owned())
}

/// Rejects bytes whose format cannot be decoded locally before they are
/// uploaded, so the remote path reports the same error as the local ones.
fn ensure_decodable(bytes: &[u8]) -> Result<(), AnalysisError> {
    let format = image::guess_format(bytes)?;
    if format.reading_enabled() {
        Ok(())
    } else {
        let hint = ImageFormatHint::Exact(format);
        Err(AnalysisError::ImageDecode(ImageError::Unsupported(
            UnsupportedError::from_format_and_kind(
                hint.clone(),
                UnsupportedErrorKind::Format(hint),
            ),
        )))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use image::{DynamicImage, Rgb, RgbImage};

    fn png(rgb: [u8; 3]) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb(rgb)))
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in AnalyzerKind::ALL {
            assert_eq!(kind.as_str().parse::<AnalyzerKind>(), Ok(kind));
        }
        assert_eq!("Color-Coverage".parse(), Ok(AnalyzerKind::ColorCoverage));
        assert!("sharpness".parse::<AnalyzerKind>().is_err());
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of("/uploads/P-0003.jpg"), "P-0003.jpg");
        assert_eq!(file_name_of("photo.png"), "photo.png");
    }

    #[test]
    fn test_ensure_decodable() {
        assert!(ensure_decodable(&png([1, 2, 3])).is_ok());
        let err = ensure_decodable(b"plain text").expect_err("not an image");
        assert_eq!(err.kind(), "image_decode");
    }

    #[tokio::test]
    async fn test_local_variant_from_bytes() {
        let engine = ComplianceEngine::new(LuminanceAnalyzer::default());
        assert_eq!(engine.analyzer_name(), "luminance");
        assert_eq!(engine.analyzer_kind(), AnalyzerKind::Luminance);

        let result = engine
            .analyze(
                ImageHandle::bytes("white.png", png([255, 255, 255])),
                &CancellationToken::new(),
            )
            .await
            .expect("verdict");
        assert!(result.is_compliant());
    }

    #[tokio::test]
    async fn test_garbage_bytes_fail_decode() {
        let engine = ComplianceEngine::new(ColorCoverageAnalyzer::default());
        let err = engine
            .analyze(
                ImageHandle::bytes("bad.jpg", b"garbage".to_vec()),
                &CancellationToken::new(),
            )
            .await
            .expect_err("decode must fail");
        assert_eq!(err.kind(), "image_decode");
    }

    #[tokio::test]
    async fn test_missing_file_is_unreadable() {
        let engine = ComplianceEngine::new(LuminanceAnalyzer::default());
        let err = engine
            .analyze(
                ImageHandle::Path("/nonexistent/shift/photo.jpg".into()),
                &CancellationToken::new(),
            )
            .await
            .expect_err("read must fail");
        assert_eq!(err.kind(), "image_unreadable");
    }

    #[tokio::test]
    async fn test_stored_without_store_is_unreadable() {
        let engine = ComplianceEngine::new(LuminanceAnalyzer::default());
        let err = engine
            .analyze(
                ImageHandle::Stored("/uploads/a.png".into()),
                &CancellationToken::new(),
            )
            .await
            .expect_err("no store");
        assert_eq!(err.kind(), "image_unreadable");
    }

    #[tokio::test]
    async fn test_pre_cancelled_call() {
        let engine = ComplianceEngine::new(LuminanceAnalyzer::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine
            .analyze(ImageHandle::bytes("a.png", png([0, 0, 0])), &cancel)
            .await
            .expect_err("cancelled");
        assert!(matches!(err, AnalysisError::Cancelled));
    }
}
