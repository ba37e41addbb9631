//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use booking_saga::SagaError;
use thiserror::Error;

use crate::config::ConfigError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Saga execution error.
    #[error(transparent)]
    Saga(#[from] SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    match &err {
        SagaError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        SagaError::InvalidTransition { .. } | SagaError::InvalidState(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        _ => {
            tracing::error!(error = %err, "saga error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Saga(#[from] SagaError),

    #[error("failed to install Prometheus recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use booking_saga::BookingStatus;
    use saga_common::BookingId;

    use super::*;
    use crate::config::Config;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(ApiError::BadRequest("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(SagaError::NotFound(BookingId::new()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                SagaError::InvalidTransition {
                    from: BookingStatus::Failed,
                    to: BookingStatus::Cancelled,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SagaError::InvalidState("busy".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SagaError::InvalidCommand("hotel".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_config_becomes_startup_error() {
        let err: StartupError = Config::from_lookup(|key| {
            (key == "SERVICE_TIMEOUT_MS").then(|| "soon".to_string())
        })
        .unwrap_err()
        .into();

        assert!(matches!(err, StartupError::Config(_)));
        assert_eq!(
            err.to_string(),
            "invalid value for SERVICE_TIMEOUT_MS: \"soon\""
        );
    }
}
