//! Prediction transport port used by the remote classifier.

use async_trait::async_trait;
use thiserror::Error;

/// One image submitted for classification.
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    /// File name reported with the upload.
    pub file_name: String,
    /// Encoded image bytes, sent unmodified.
    pub bytes: Vec<u8>,
}

/// Raw answer from the prediction service.
#[derive(Debug, Clone)]
pub struct PredictionReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl PredictionReply {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failure to obtain any reply from the service.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The service could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The service did not answer in time.
    #[error("request timed out")]
    Timeout,

    /// Any other transport-level failure.
    #[error("{0}")]
    Other(String),
}

/// Port for sending an image to a prediction service.
#[async_trait]
pub trait PredictionTransport: Send + Sync {
    /// Uploads the image and returns the raw reply.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if no reply was received. A reply with a
    /// non-2xx status is not an error at this layer.
    async fn predict(&self, request: PredictionRequest) -> Result<PredictionReply, TransportError>;
}
