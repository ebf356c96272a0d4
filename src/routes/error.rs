// API error: every failure becomes a status code plus an inline `{ "error": ... }` body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::export::RenderError;
use crate::models::ParseError;
use crate::prediction::PredictionError;
use crate::relay::RelayError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("access code required")]
    Unauthorized,
    #[error("invalid access code")]
    InvalidCode,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("invalid reading: {0}")]
    Parse(#[from] ParseError),
    #[error("Failed to send: {0}")]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Prediction(#[from] PredictionError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidCode => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Relay(_) | ApiError::Prediction(_) => StatusCode::BAD_GATEWAY,
            ApiError::Render(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Internal(e) => tracing::warn!(error = %e, "request failed"),
            ApiError::Relay(_) | ApiError::Prediction(_) | ApiError::Render(_) => {
                tracing::info!(error = %self, "collaborator failure")
            }
            _ => {}
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
