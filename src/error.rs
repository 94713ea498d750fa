use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{inference::InferenceError, store::StoreError};

/// Failures on the request path. Each maps to one status code and a JSON body.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("No image provided")]
    MissingImage,

    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Failed to parse response")]
    UnparsableResponse(#[source] serde_json::Error),

    /// Valid JSON that does not have the diagnosis shape.
    #[error("Response did not match the diagnosis schema")]
    SchemaMismatch(#[source] serde_json::Error),

    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("Storage failed: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingImage => StatusCode::BAD_REQUEST,
            AppError::Multipart(e) => e.status(),
            AppError::UnparsableResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SchemaMismatch(_) | AppError::Inference(_) => StatusCode::BAD_GATEWAY,
            AppError::Encode(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            AppError::UnparsableResponse(e) | AppError::SchemaMismatch(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let details = self.details();

        tracing::error!(
            status = %status,
            message = %message,
            details = details.as_deref().unwrap_or(""),
            "Request error"
        );

        let body = match details {
            Some(details) => json!({ "error": message, "details": details }),
            None => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Server(#[from] hyper::Error),
}
