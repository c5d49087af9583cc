//! Liveness and health endpoints.

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Root liveness response.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    /// Liveness text
    pub message: &'static str,
}

/// Root endpoint.
///
/// ```bash
/// curl http://localhost:5000/
/// # {"message":"Server is running"}
/// ```
#[allow(clippy::unused_async)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Server is running",
    })
}

/// Health check. Returns 200 with an empty body.
///
/// Does not check dependencies.
#[allow(clippy::unused_async)]
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_root_message() {
        let Json(body) = root().await;
        assert_eq!(body.message, "Server is running");
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        assert_eq!(health_check().await, StatusCode::OK);
    }
}
