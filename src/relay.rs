// Report relay client: posts a rendered report to the email relay endpoint.
// One request per send; failures are returned to the caller, never retried.

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay request failed: {0}")]
    Transport(String),
    #[error("relay returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("relay response malformed: {0}")]
    Malformed(String),
    #[error("relay rejected report: {0}")]
    Rejected(String),
}

/// Wire body expected by the relay endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEmail {
    #[serde(rename = "email")]
    pub recipient_email: String,
    pub patient_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// Rendered document bytes, base64 (standard alphabet).
    #[serde(rename = "pdfBase64")]
    pub document_base64: String,
}

impl ReportEmail {
    pub fn new(
        recipient_email: impl Into<String>,
        patient_id: impl Into<String>,
        remarks: Option<String>,
        document: &[u8],
    ) -> Self {
        Self {
            recipient_email: recipient_email.into(),
            patient_id: patient_id.into(),
            remarks: remarks.filter(|r| !r.trim().is_empty()),
            document_base64: base64::engine::general_purpose::STANDARD.encode(document),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    success: Option<bool>,
    error: Option<String>,
}

pub struct ReportRelay {
    client: reqwest::Client,
    endpoint: String,
}

impl ReportRelay {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    #[instrument(skip(self, email), fields(client = "relay", operation = "send", patient_id = %email.patient_id))]
    pub async fn send(&self, email: &ReportEmail) -> Result<(), RelayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(email)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<RelayResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(RelayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: RelayResponse =
            serde_json::from_str(&body).map_err(|e| RelayError::Malformed(e.to_string()))?;
        match parsed.success {
            Some(true) => {
                tracing::info!("report relayed");
                Ok(())
            }
            Some(false) => Err(RelayError::Rejected(
                parsed.error.unwrap_or_else(|| "Unknown error".to_string()),
            )),
            None => Err(RelayError::Malformed("missing success field".to_string())),
        }
    }
}
