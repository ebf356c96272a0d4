// Prediction service client: multipart file upload, validated response. Display only.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("prediction request failed: {0}")]
    Transport(String),
    #[error("Prediction API error (HTTP {0})")]
    Status(u16),
    #[error("prediction response malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: String,
    pub probabilities: BTreeMap<String, f64>,
}

impl Prediction {
    /// Parse and validate: non-empty label, every probability finite and in [0, 1].
    pub fn parse(body: &str) -> Result<Self, PredictionError> {
        let p: Prediction =
            serde_json::from_str(body).map_err(|e| PredictionError::Malformed(e.to_string()))?;
        if p.prediction.trim().is_empty() {
            return Err(PredictionError::Malformed("empty prediction".to_string()));
        }
        if let Some((label, v)) = p
            .probabilities
            .iter()
            .find(|(_, v)| !v.is_finite() || !(0.0..=1.0).contains(*v))
        {
            return Err(PredictionError::Malformed(format!(
                "probability for {} out of range: {}",
                label, v
            )));
        }
        Ok(p)
    }
}

pub struct PredictionClient {
    client: reqwest::Client,
    endpoint: String,
}

impl PredictionClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, PredictionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PredictionError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    #[instrument(skip(self, bytes), fields(client = "prediction", operation = "predict", size = bytes.len()))]
    pub async fn predict(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Prediction, PredictionError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PredictionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictionError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| PredictionError::Transport(e.to_string()))?;
        Prediction::parse(&body)
    }
}
