//! HTTP transport tests against an in-process prediction service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use compliance_adapters::HttpPredictionClient;
use compliance_core::modules::{RemoteClassifierAnalyzer, RemoteClassifierConfig};
use compliance_core::{
    AnalysisError, ComplianceEngine, ImageHandle, PredictionRequest, PredictionTransport,
};
use compliance_test_support::{SyntheticImageBuilder, MARKER_GREEN};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
struct Upload {
    api_key: Option<String>,
    part_name: Option<String>,
    file_name: Option<String>,
    bytes: Vec<u8>,
}

struct Service {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    uploads: Mutex<Vec<Upload>>,
}

async fn predict(
    State(service): State<Arc<Service>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, &'static str) {
    let mut upload = Upload {
        api_key: headers
            .get("Prediction-Key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ..Upload::default()
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        upload.part_name = field.name().map(str::to_string);
        upload.file_name = field.file_name().map(str::to_string);
        upload.bytes = field.bytes().await.unwrap().to_vec();
    }
    service.uploads.lock().unwrap().push(upload);

    tokio::time::sleep(service.delay).await;
    (service.status, service.body)
}

async fn spawn_service(
    status: StatusCode,
    body: &'static str,
    delay: Duration,
) -> (String, Arc<Service>) {
    let service = Arc::new(Service {
        status,
        body,
        delay,
        uploads: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/predict", post(predict))
        .with_state(Arc::clone(&service));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/predict"), service)
}

fn client(endpoint: &str) -> HttpPredictionClient {
    HttpPredictionClient::new(endpoint, "secret-key", Duration::from_secs(2)).expect("client")
}

const COMPLIANT_BODY: &str =
    r#"{"predictions":[{"tagName":"compliant","probability":0.94},{"tagName":"non-compliant","probability":0.06}]}"#;

#[tokio::test]
async fn test_upload_shape() {
    let (endpoint, service) = spawn_service(StatusCode::OK, COMPLIANT_BODY, Duration::ZERO).await;

    let reply = client(&endpoint)
        .predict(PredictionRequest {
            file_name: "P-0003.jpg".into(),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3],
        })
        .await
        .expect("reply");

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, COMPLIANT_BODY.as_bytes());

    let uploads = service.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    let upload = &uploads[0];
    assert_eq!(upload.api_key.as_deref(), Some("secret-key"));
    assert_eq!(upload.part_name.as_deref(), Some("imageData"));
    assert_eq!(upload.file_name.as_deref(), Some("P-0003.jpg"));
    assert_eq!(upload.bytes, vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]);
}

#[tokio::test]
async fn test_error_status_is_a_reply() {
    let (endpoint, _service) =
        spawn_service(StatusCode::INTERNAL_SERVER_ERROR, "boom", Duration::ZERO).await;

    let reply = client(&endpoint)
        .predict(PredictionRequest {
            file_name: "a.png".into(),
            bytes: vec![1],
        })
        .await
        .expect("reply");
    assert_eq!(reply.status, 500);
    assert!(!reply.is_success());
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client(&format!("http://{addr}/predict"))
        .predict(PredictionRequest {
            file_name: "a.png".into(),
            bytes: vec![1],
        })
        .await;
    assert!(result.is_err());
}

fn remote_engine(endpoint: &str, timeout: Duration) -> ComplianceEngine {
    ComplianceEngine::new(RemoteClassifierAnalyzer::new(
        Arc::new(client(endpoint)),
        RemoteClassifierConfig {
            request_timeout: timeout,
            ..RemoteClassifierConfig::default()
        },
    ))
}

fn photo() -> ImageHandle {
    SyntheticImageBuilder::png_handle(
        "shift.png",
        &SyntheticImageBuilder::solid(64, 48, MARKER_GREEN),
    )
}

#[tokio::test]
async fn test_engine_round_trip() {
    let (endpoint, service) = spawn_service(StatusCode::OK, COMPLIANT_BODY, Duration::ZERO).await;
    let engine = remote_engine(&endpoint, Duration::from_secs(5));

    let result = engine
        .analyze(photo(), &CancellationToken::new())
        .await
        .expect("verdict");
    assert!(result.is_compliant());
    assert!((result.score() - 0.94).abs() < 1e-6);
    assert_eq!(service.uploads.lock().unwrap()[0].file_name.as_deref(), Some("shift.png"));
}

#[tokio::test]
async fn test_engine_slow_service_times_out() {
    let (endpoint, _service) =
        spawn_service(StatusCode::OK, COMPLIANT_BODY, Duration::from_secs(10)).await;
    let engine = remote_engine(&endpoint, Duration::from_millis(200));

    let err = engine
        .analyze(photo(), &CancellationToken::new())
        .await
        .expect_err("must time out");
    assert!(matches!(err, AnalysisError::AnalysisUnavailable { .. }));
}

#[tokio::test]
async fn test_engine_garbage_body_is_unavailable() {
    let (endpoint, _service) =
        spawn_service(StatusCode::OK, "<html>maintenance</html>", Duration::ZERO).await;
    let engine = remote_engine(&endpoint, Duration::from_secs(5));

    let err = engine
        .analyze(photo(), &CancellationToken::new())
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), "analysis_unavailable");
}
