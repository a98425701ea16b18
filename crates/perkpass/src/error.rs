use crate::config::ConfigError;
use crate::issuance::IssuanceError;
use crate::redemption::RedemptionServiceError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Issuance(IssuanceError),
    Redemption(RedemptionServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Issuance(err) => write!(f, "issuance error: {}", err),
            AppError::Redemption(err) => write!(f, "redemption error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Issuance(err) => Some(err),
            AppError::Redemption(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Issuance(IssuanceError::MissingField { .. })
            | AppError::Issuance(IssuanceError::NotConfigured) => StatusCode::BAD_REQUEST,
            AppError::Issuance(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Redemption(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal failures stay opaque; caller-triggered ones carry detail.
        let body = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                Json(json!({ "ok": false, "error": "internal error" }))
            }
            _ => Json(json!({ "ok": false, "error": self.to_string() })),
        };
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<IssuanceError> for AppError {
    fn from(value: IssuanceError) -> Self {
        Self::Issuance(value)
    }
}

impl From<RedemptionServiceError> for AppError {
    fn from(value: RedemptionServiceError) -> Self {
        Self::Redemption(value)
    }
}
