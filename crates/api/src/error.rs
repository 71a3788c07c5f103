//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::SagaError;

/// Message returned when a rent is refused because payments are down.
pub const PAYMENT_UNAVAILABLE_MESSAGE: &str = "Payment Service unavailable";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// A backend the request depends on is unavailable.
    ServiceUnavailable(String),
    /// Saga execution error.
    Saga(SagaError),
    /// Internal server error.
    Internal(String),
}

impl ApiError {
    /// Maps a failed finish or cancel to 404, whatever went wrong.
    pub fn rental_not_processed(err: SagaError) -> Self {
        tracing::warn!(error = %err, compensation_failed = err.is_compensation_failure(), "rental not processed");
        ApiError::NotFound(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ServiceUnavailable(msg) => {
                let body = serde_json::json!({ "message": msg });
                return (StatusCode::SERVICE_UNAVAILABLE, axum::Json(body)).into_response();
            }
            ApiError::Saga(err) => saga_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    match &err {
        SagaError::PaymentUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            PAYMENT_UNAVAILABLE_MESSAGE.to_string(),
        ),
        _ if err.is_not_found() => (StatusCode::NOT_FOUND, err.to_string()),
        _ => {
            tracing::error!(
                error = %err,
                compensation_failed = err.is_compensation_failure(),
                "saga error"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        match err {
            SagaError::PaymentUnavailable => {
                ApiError::ServiceUnavailable(PAYMENT_UNAVAILABLE_MESSAGE.to_string())
            }
            other => ApiError::Saga(other),
        }
    }
}
