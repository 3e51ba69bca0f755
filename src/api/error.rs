use crate::services::compressor::CompressionError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Compressed output exceeds the configured ceiling
    #[error("Compressed file exceeds the {limit_mb} MB limit")]
    OutputTooLarge { limit_mb: u64, compressed_size_mb: f64 },

    #[error(transparent)]
    Compression(#[from] CompressionError),

    #[error("{0:#}")]
    Storage(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) | AppError::OutputTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            AppError::Compression(_) | AppError::Storage(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        let body = match &self {
            AppError::OutputTooLarge {
                compressed_size_mb, ..
            } => json!({
                "error": message,
                "compressedSizeMb": compressed_size_mb,
            }),
            _ => {
                if status.is_server_error() {
                    tracing::error!("PDF compression request failed: {:?}", self);
                }
                json!({ "error": message })
            }
        };

        (status, Json(body)).into_response()
    }
}
