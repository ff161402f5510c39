//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gamemaster_core::error::GmError;
use serde::Serialize;
use thiserror::Error;

/// Failures that stop the server from starting or keep it from serving.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad or missing environment configuration, or an unbuildable client.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Could not reach the play-log database.
    #[error("play-log database unavailable: {0}")]
    Database(#[from] sqlx::Error),

    /// The play-log schema could not be brought up to date.
    #[error("schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Binding the listener or serving connections failed.
    #[error("listener failed: {0}")]
    Server(#[from] std::io::Error),

    /// The tracing subscriber or span exporter could not be installed.
    #[error("telemetry setup failed: {0}")]
    Telemetry(String),
}

impl From<gamemaster_clients::ConfigError> for AppError {
    fn from(err: gamemaster_clients::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Body of every non-2xx JSON response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// `validation_error` or `internal_error`.
    pub error: &'static str,
    /// Safe-to-show description.
    pub message: String,
}

/// HTTP-layer wrapper around `GmError` that implements `IntoResponse`.
///
/// Only validation failures are described to the caller; every other
/// failure is logged and answered with a generic 500.
#[derive(Debug)]
pub struct ApiError(pub GmError);

impl From<GmError> for ApiError {
    fn from(err: GmError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            GmError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "validation_error",
                    message: self.0.to_string(),
                },
            ),
            other => {
                tracing::error!(error = %other, service = ?other.service(), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "internal_error",
                        message: "Internal Server Error".to_owned(),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
