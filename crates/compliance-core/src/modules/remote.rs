//! Remote classifier analyzer.
//!
//! Delegates the verdict to an external prediction service. The service
//! returns a ranked list of labels; the most probable label decides the
//! verdict and its probability becomes the score.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{AnalysisError, ComplianceResult};
use crate::ports::{PredictionReply, PredictionRequest, PredictionTransport};

/// Configuration for the remote classifier.
#[derive(Debug, Clone)]
pub struct RemoteClassifierConfig {
    /// Label that means "compliant", compared case-insensitively.
    pub compliant_label: String,
    /// Upper bound on a single round trip.
    pub request_timeout: Duration,
    /// Maximum concurrent requests to the service.
    pub max_in_flight: usize,
}

impl Default for RemoteClassifierConfig {
    fn default() -> Self {
        Self {
            compliant_label: "compliant".to_string(),
            request_timeout: Duration::from_secs(30),
            max_in_flight: 8,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(rename = "tagName", alias = "label")]
    tag_name: String,
    probability: f64,
}

/// Turns a raw service reply into a verdict.
///
/// # Errors
///
/// Returns [`AnalysisError::AnalysisUnavailable`] for a non-2xx status, a
/// body that is not the expected JSON, an empty prediction list, or a
/// non-finite probability.
pub fn interpret(
    reply: &PredictionReply,
    compliant_label: &str,
) -> Result<ComplianceResult, AnalysisError> {
    if !reply.is_success() {
        return Err(AnalysisError::unavailable(format!(
            "service returned status {}",
            reply.status
        )));
    }

    let response: PredictionResponse = serde_json::from_slice(&reply.body)
        .map_err(|e| AnalysisError::unavailable(format!("malformed response: {e}")))?;

    let best = response
        .predictions
        .into_iter()
        .filter(|p| p.probability.is_finite())
        .max_by(|a, b| a.probability.total_cmp(&b.probability))
        .ok_or_else(|| AnalysisError::unavailable("response contained no usable predictions"))?;

    let is_compliant = best.tag_name.eq_ignore_ascii_case(compliant_label);
    debug!(label = %best.tag_name, probability = best.probability, "Top prediction");
    Ok(ComplianceResult::new(is_compliant, best.probability))
}

/// Remote prediction-service analyzer.
pub struct RemoteClassifierAnalyzer {
    transport: Arc<dyn PredictionTransport>,
    config: RemoteClassifierConfig,
    permits: Semaphore,
}

impl RemoteClassifierAnalyzer {
    /// Creates an analyzer that sends requests through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn PredictionTransport>, config: RemoteClassifierConfig) -> Self {
        let permits = Semaphore::new(config.max_in_flight.max(1));
        Self {
            transport,
            config,
            permits,
        }
    }

    /// Returns the analyzer configuration.
    #[must_use]
    pub const fn config(&self) -> &RemoteClassifierConfig {
        &self.config
    }

    /// Returns the name of this analyzer.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        "remote"
    }

    /// Uploads one image and interprets the reply.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Cancelled`] if `cancel` fires while waiting
    /// for a permit or for the reply, and
    /// [`AnalysisError::AnalysisUnavailable`] for timeouts, transport
    /// failures and unusable replies.
    pub async fn classify(
        &self,
        request: PredictionRequest,
        cancel: &CancellationToken,
    ) -> Result<ComplianceResult, AnalysisError> {
        let _permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            permit = self.permits.acquire() => permit
                .map_err(|_| AnalysisError::unavailable("remote analyzer shut down"))?,
        };

        let file_name = request.file_name.clone();
        let call = tokio::time::timeout(
            self.config.request_timeout,
            self.transport.predict(request),
        );

        let reply = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            outcome = call => match outcome {
                Err(_) => {
                    warn!(
                        file = %file_name,
                        timeout = ?self.config.request_timeout,
                        "Prediction request timed out"
                    );
                    return Err(AnalysisError::unavailable("request timed out"));
                }
                Ok(Err(e)) => {
                    warn!(file = %file_name, error = %e, "Prediction request failed");
                    return Err(AnalysisError::unavailable(e));
                }
                Ok(Ok(reply)) => reply,
            },
        };

        interpret(&reply, &self.config.compliant_label).inspect_err(|e| {
            warn!(
                file = %file_name,
                status = reply.status,
                error = %e,
                "Unusable prediction reply"
            );
        })
    }
}
