//! End-to-end engine scenarios over encoded images.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use compliance_core::modules::{
    ColorCoverageAnalyzer, LuminanceAnalyzer, MarkerReferences, RemoteClassifierAnalyzer,
    RemoteClassifierConfig, TemplateMatchAnalyzer, TemplateMatchConfig,
};
use compliance_core::sampling::Corner;
use compliance_core::{AnalysisError, ComplianceEngine, ImageHandle, PredictionRequest};
use compliance_test_support::{
    MockImageStore, MockPredictionTransport, SyntheticImageBuilder, MARKER_GREEN, MARKER_RED,
    NEUTRAL_GRAY,
};
use image::DynamicImage;
use tokio_util::sync::CancellationToken;

fn marker_photo(marker: [u8; 3], corner: Corner) -> Vec<u8> {
    let photo =
        SyntheticImageBuilder::with_corner_patch(800, 600, NEUTRAL_GRAY, corner, 150, marker);
    SyntheticImageBuilder::png_bytes(&photo)
}

fn template_engine() -> ComplianceEngine {
    let references = MarkerReferences::from_images(
        &DynamicImage::ImageRgb8(SyntheticImageBuilder::check_marker(128)),
        &DynamicImage::ImageRgb8(SyntheticImageBuilder::x_marker(128)),
        64,
    );
    ComplianceEngine::new(TemplateMatchAnalyzer::new(
        TemplateMatchConfig::default(),
        Arc::new(references),
    ))
}

fn remote_engine(transport: Arc<MockPredictionTransport>) -> ComplianceEngine {
    ComplianceEngine::new(RemoteClassifierAnalyzer::new(
        transport,
        RemoteClassifierConfig {
            request_timeout: Duration::from_secs(5),
            ..RemoteClassifierConfig::default()
        },
    ))
}

#[tokio::test]
async fn test_green_corner_is_compliant() {
    let engine = ComplianceEngine::new(ColorCoverageAnalyzer::default());
    for corner in [Corner::TopLeft, Corner::BottomRight] {
        let result = engine
            .analyze(
                ImageHandle::bytes("green.png", marker_photo(MARKER_GREEN, corner)),
                &CancellationToken::new(),
            )
            .await
            .expect("verdict");
        assert!(result.is_compliant(), "{corner:?}");
        assert!(result.score() > 0.9, "{corner:?} score {}", result.score());
    }
}

#[tokio::test]
async fn test_red_corner_is_not_compliant() {
    let engine = ComplianceEngine::new(ColorCoverageAnalyzer::default());
    let result = engine
        .analyze(
            ImageHandle::bytes("red.png", marker_photo(MARKER_RED, Corner::TopRight)),
            &CancellationToken::new(),
        )
        .await
        .expect("verdict");
    assert!(!result.is_compliant());
    assert!(result.score() > 0.9);
}

#[tokio::test]
async fn test_jpeg_input_is_accepted() {
    let photo = SyntheticImageBuilder::with_corner_patch(
        640,
        480,
        NEUTRAL_GRAY,
        Corner::BottomLeft,
        160,
        MARKER_GREEN,
    );
    let engine = ComplianceEngine::new(ColorCoverageAnalyzer::default());
    let result = engine
        .analyze(
            ImageHandle::bytes("shift.jpg", SyntheticImageBuilder::jpeg_bytes(&photo, 90)),
            &CancellationToken::new(),
        )
        .await
        .expect("verdict");
    assert!(result.is_compliant());
}

#[tokio::test]
async fn test_template_match_on_drawn_markers() {
    let engine = template_engine();
    let cancel = CancellationToken::new();

    let checked = SyntheticImageBuilder::with_corner_image(
        900,
        700,
        NEUTRAL_GRAY,
        Corner::BottomRight,
        &SyntheticImageBuilder::check_marker(120),
    );
    let result = engine
        .analyze(SyntheticImageBuilder::png_handle("check.png", &checked), &cancel)
        .await
        .expect("verdict");
    assert!(result.is_compliant());

    let crossed = SyntheticImageBuilder::with_corner_image(
        900,
        700,
        NEUTRAL_GRAY,
        Corner::TopLeft,
        &SyntheticImageBuilder::x_marker(120),
    );
    let result = engine
        .analyze(SyntheticImageBuilder::png_handle("x.png", &crossed), &cancel)
        .await
        .expect("verdict");
    assert!(!result.is_compliant());
}

#[tokio::test]
async fn test_luminance_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bright.png");
    SyntheticImageBuilder::gray(120, 90, 230)
        .save(&path)
        .unwrap();

    let engine = ComplianceEngine::new(LuminanceAnalyzer::default());
    let result = engine
        .analyze(ImageHandle::Path(path), &CancellationToken::new())
        .await
        .expect("verdict");
    assert!(result.is_compliant());
}

#[tokio::test]
async fn test_unsupported_format_fails_decode() {
    let engine = ComplianceEngine::new(LuminanceAnalyzer::default());
    let err = engine
        .analyze(
            ImageHandle::bytes("notes.txt", b"shift notes, not a photo".to_vec()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::ImageDecode(_)));
}

#[tokio::test]
async fn test_concurrent_calls_agree() {
    let engine = Arc::new(ComplianceEngine::new(ColorCoverageAnalyzer::default()));
    let bytes = marker_photo(MARKER_GREEN, Corner::TopRight);

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let bytes = bytes.clone();
            tokio::spawn(async move {
                engine
                    .analyze(
                        ImageHandle::bytes(format!("{i}.png"), bytes),
                        &CancellationToken::new(),
                    )
                    .await
                    .expect("verdict")
            })
        })
        .collect();

    let mut results = Vec::new();
    for task in tasks {
        results.push(task.await.unwrap());
    }
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn test_remote_verdict_from_stored_reference() {
    let transport = Arc::new(MockPredictionTransport::predicting("Compliant", 0.87));
    let store = MockImageStore::new().with(
        "/uploads/P-0003.jpg",
        marker_photo(MARKER_GREEN, Corner::TopLeft),
    );
    let store = Arc::new(store);
    let engine = remote_engine(Arc::clone(&transport)).with_store(store.clone());

    let result = engine
        .analyze(
            ImageHandle::Stored("/uploads/P-0003.jpg".into()),
            &CancellationToken::new(),
        )
        .await
        .expect("verdict");

    assert!(result.is_compliant());
    assert!((result.score() - 0.87).abs() < 1e-6);
    assert_eq!(transport.file_names(), vec!["P-0003.jpg".to_string()]);
    assert_eq!(store.reads(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_remote_requests_bounded_by_max_in_flight() {
    let transport = Arc::new(
        MockPredictionTransport::predicting("compliant", 0.9)
            .with_delay(Duration::from_millis(50)),
    );
    let analyzer = Arc::new(RemoteClassifierAnalyzer::new(
        transport.clone(),
        RemoteClassifierConfig {
            max_in_flight: 2,
            ..RemoteClassifierConfig::default()
        },
    ));

    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let analyzer = Arc::clone(&analyzer);
            tokio::spawn(async move {
                let request = PredictionRequest {
                    file_name: format!("{i}.png"),
                    bytes: marker_photo(MARKER_GREEN, Corner::TopLeft),
                };
                analyzer.classify(request, &CancellationToken::new()).await
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().expect("verdict").is_compliant());
    }
    assert_eq!(transport.calls(), 6);
    assert_eq!(transport.peak_in_flight(), 2);
}

#[tokio::test]
async fn test_remote_failures_are_unavailable() {
    let transports = [
        MockPredictionTransport::failing("connection refused"),
        MockPredictionTransport::reply(503, "busy"),
        MockPredictionTransport::reply(200, r#"{"predictions":[]}"#),
        MockPredictionTransport::reply(200, "<html>oops</html>"),
    ];
    for transport in transports {
        let engine = remote_engine(Arc::new(transport));
        let err = engine
            .analyze(
                ImageHandle::bytes("a.png", marker_photo(MARKER_RED, Corner::TopLeft)),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, AnalysisError::AnalysisUnavailable { .. }),
            "unexpected {err:?}"
        );
    }
}

#[tokio::test]
async fn test_remote_rejects_undecodable_bytes_without_upload() {
    let transport = Arc::new(MockPredictionTransport::predicting("compliant", 1.0));
    let engine = remote_engine(Arc::clone(&transport));
    let err = engine
        .analyze(
            ImageHandle::bytes("broken.jpg", b"GIF? no".to_vec()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "image_decode");
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_cancel_during_remote_call() {
    let transport = Arc::new(MockPredictionTransport::hanging());
    let engine = remote_engine(Arc::clone(&transport));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = engine
        .analyze(
            ImageHandle::bytes("slow.png", marker_photo(MARKER_GREEN, Corner::TopLeft)),
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Cancelled));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_missing_stored_reference_is_unreadable() {
    let engine = ComplianceEngine::new(LuminanceAnalyzer::default())
        .with_store(Arc::new(MockImageStore::new()));
    let err = engine
        .analyze(
            ImageHandle::Stored("/uploads/missing.jpg".into()),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    match err {
        AnalysisError::ImageUnreadable { location, .. } => {
            assert_eq!(location, "/uploads/missing.jpg");
        }
        other => panic!("unexpected {other:?}"),
    }
}
