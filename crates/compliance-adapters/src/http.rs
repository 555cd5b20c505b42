//! HTTP transport for the remote prediction service.

use std::time::Duration;

use async_trait::async_trait;
use compliance_core::{PredictionReply, PredictionRequest, PredictionTransport, TransportError};
use reqwest::multipart::{Form, Part};
use tracing::debug;

/// Header carrying the service API key.
pub const API_KEY_HEADER: &str = "Prediction-Key";

/// Multipart part name the image bytes are sent under.
pub const IMAGE_PART: &str = "imageData";

const USER_AGENT: &str = concat!("shift-compliance/", env!("CARGO_PKG_VERSION"));

/// Sends images to a prediction endpoint as a single-part multipart upload.
pub struct HttpPredictionClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpPredictionClient {
    /// Creates a client for `endpoint`.
    ///
    /// Only the connection phase is bounded here; the overall request
    /// deadline is enforced by the remote analyzer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Other`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// The configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn map_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[async_trait]
impl PredictionTransport for HttpPredictionClient {
    async fn predict(&self, request: PredictionRequest) -> Result<PredictionReply, TransportError> {
        let size = request.bytes.len();
        let part = Part::bytes(request.bytes)
            .file_name(request.file_name.clone())
            .mime_str("application/octet-stream")
            .map_err(|e| map_error(&e))?;
        let form = Form::new().part(IMAGE_PART, part);

        debug!(
            endpoint = %self.endpoint,
            file = %request.file_name,
            bytes = size,
            "Uploading image for prediction"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_error(&e))?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| map_error(&e))?;

        debug!(status, bytes = body.len(), "Prediction service replied");
        Ok(PredictionReply {
            status,
            body: body.to_vec(),
        })
    }
}
