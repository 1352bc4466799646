//! Client for the external view prediction service.
//!
//! One `POST` per record, no retry. Every failure mode (non-2xx, a body
//! without a prediction, an unreachable server) comes back as a
//! [`PredictionError`] carrying a specific message, and only affects the
//! record it was computed for.
//!
//! # Wire format
//!
//! ```json
//! // request
//! { "is_short": false, "elapsed_time": 12.5, "subscriber_count": 1000, "like_count": 100 }
//! // response
//! { "predicted_view_count": 500 }   // or { "error": "..." }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::PredictionConfig;
use crate::models::PredictionFeatures;

pub const NETWORK_ERROR_MESSAGE: &str = "network error: prediction server unreachable";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PredictionError(pub String);

#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, features: &PredictionFeatures) -> Result<u64, PredictionError>;
}

#[derive(Debug, Serialize)]
struct PredictionRequest {
    is_short: bool,
    elapsed_time: f64,
    subscriber_count: u64,
    like_count: u64,
}

impl From<&PredictionFeatures> for PredictionRequest {
    fn from(f: &PredictionFeatures) -> Self {
        Self {
            is_short: f.is_short,
            elapsed_time: f.elapsed_days,
            subscriber_count: f.member_count,
            like_count: f.like_count,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    #[serde(default, alias = "predictedViewCount")]
    predicted_view_count: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpPredictionClient {
    client: reqwest::Client,
    url: String,
}

impl HttpPredictionClient {
    pub fn new(config: &PredictionConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl Predictor for HttpPredictionClient {
    async fn predict(&self, features: &PredictionFeatures) -> Result<u64, PredictionError> {
        let response = self
            .client
            .post(&self.url)
            .json(&PredictionRequest::from(features))
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, url = %self.url, "prediction request failed");
                PredictionError(NETWORK_ERROR_MESSAGE.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            debug!(error = %e, "prediction body unreadable");
            PredictionError(NETWORK_ERROR_MESSAGE.to_string())
        })?;

        interpret(status, &body)
    }
}

/// Turn a prediction service reply into a view count or a record-level error.
fn interpret(status: reqwest::StatusCode, body: &str) -> Result<u64, PredictionError> {
    let parsed: Option<PredictionResponse> = serde_json::from_str(body).ok();

    if !status.is_success() {
        let message = parsed
            .and_then(|p| p.error)
            .unwrap_or_else(|| format!("prediction server returned HTTP {}", status.as_u16()));
        return Err(PredictionError(message));
    }

    let parsed = parsed.ok_or_else(|| {
        PredictionError("malformed prediction response".to_string())
    })?;

    if let Some(error) = parsed.error {
        return Err(PredictionError(error));
    }

    match parsed.predicted_view_count {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v.floor() as u64),
        Some(_) => Err(PredictionError("invalid predicted view count".to_string())),
        None => Err(PredictionError(
            "prediction response missing predicted_view_count".to_string(),
        )),
    }
}
