//! HTTP error responses.
//!
//! Bridges domain errors to JSON bodies. Every error body carries a stable
//! `status` field plus a human-readable `message`.

use crate::error::{FieldError, RegistrationError, StoreError};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    errors: Vec<FieldError>,
}

impl ApiError {
    /// Create an error with a status code and message.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Create a 422 Unprocessable Entity error with field details.
    #[must_use]
    pub fn validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
            errors,
        }
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "Request failed");
        }

        let body = ErrorBody {
            status: "error",
            message: self.message,
            errors: self.errors,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(e) => {
                Self::validation("Invalid registration data", e.errors().to_vec())
            }
            RegistrationError::Store(e) => e.into(),
            RegistrationError::CodeImage(e) => Self::internal(format!("QR code error: {e}")),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => Self::validation(e.body_text(), Vec::new()),
            other => Self::bad_request(other.body_text()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ValidationErrors;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields() {
        let err: ApiError = RegistrationError::from(ValidationErrors::new(vec![FieldError::new(
            "events",
            "select at least one event",
        )]))
        .into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(err.into_response()).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["errors"][0]["field"], "events");
    }

    #[tokio::test]
    async fn test_store_error_is_500_without_field_list() {
        let err: ApiError = StoreError::Database("connection refused".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(err.into_response()).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "database error: connection refused");
        assert!(body.get("errors").is_none());
    }
}
