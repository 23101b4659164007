use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meli_core::ApiError;
use thiserror::Error;
use tracing::{error, warn};

use crate::extract::ExtractionError;
use crate::voice::VoiceError;

pub const FAILURE_BODY: &str = "An error occurred while processing the request";

/// Failure of an endpoint handler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("no agent record with agent_id_text `{0}`")]
    UnknownAgent(String),
    #[error("record store: {0}")]
    Records(#[from] ApiError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Voice(#[from] VoiceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::InvalidPayload(message) => {
                warn!(error = %message, "rejected malformed payload");
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            AppError::Records(ref e) if e.is_remote() => {
                error!(status = e.status(), error = %e, "record store rejected request");
                (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY).into_response()
            }
            other => {
                error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY).into_response()
            }
        }
    }
}
