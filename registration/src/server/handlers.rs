//! Registration and webhook endpoints.
//!
//! - `POST /register` - submit a registration (idempotent on email)
//! - `POST /webhook` - payment gateway callback

use super::error::ApiError;
use super::state::AppState;
use crate::service::RegistrationOutcome;
use crate::types::{PaymentStatus, RegistrationRequest};
use crate::webhook::WebhookEnvelope;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Response after a registration submission.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// Always `success`
    pub status: &'static str,
    /// Ticket identifier
    pub ticket_id: String,
    /// Code image reference
    pub qr_code: String,
    /// Whether a confirmation email was sent for this request
    pub email_sent: bool,
    /// Payment status of the registration
    pub payment_status: PaymentStatus,
}

impl From<&RegistrationOutcome> for RegisterResponse {
    fn from(outcome: &RegistrationOutcome) -> Self {
        let registration = outcome.registration();
        Self {
            status: "success",
            ticket_id: registration.ticket_id.to_string(),
            qr_code: registration.qr_code.clone(),
            email_sent: outcome.email_sent(),
            payment_status: registration.payment_status,
        }
    }
}

/// Webhook acknowledgement body.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// `success`, `warning`, `ignored`, `invalid` or `error`
    pub status: &'static str,
    /// Human-readable detail
    pub message: String,
}

/// Submit a registration.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:5000/register \
///   -H "Content-Type: application/json" \
///   -d '{
///     "name": "A", "email": "a@x.com", "phone": "9000000001",
///     "whatsapp": "9000000001", "college": "GEC", "year": "2",
///     "department": "IT", "events": ["hack"], "payment_mode": "offline"
///   }'
/// ```
///
/// Response:
/// ```json
/// {
///   "status": "success",
///   "ticket_id": "INF25-7421",
///   "qr_code": "qrcodes/INF25-7421.png",
///   "email_sent": true,
///   "payment_status": "pending"
/// }
/// ```
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(request) = payload?;
    let outcome = state.registrations.submit(request).await?;
    Ok(Json(RegisterResponse::from(&outcome)))
}

/// Receive a payment gateway event.
///
/// Any parsable envelope is acknowledged with 200, including events that
/// match nothing. An unparsable body is 400 and a store outage is 500.
pub async fn webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookEnvelope>, JsonRejection>,
) -> Response {
    let envelope = match payload {
        Ok(Json(envelope)) => envelope,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Unparsable webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse {
                    status: "error",
                    message: rejection.body_text(),
                }),
            )
                .into_response();
        }
    };

    match state.webhooks.handle(&envelope).await {
        Ok(ack) => (
            StatusCode::OK,
            Json(WebhookResponse {
                status: ack.status(),
                message: ack.message(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(WebhookResponse {
                status: "error",
                message: format!("Database error: {e}"),
            }),
        )
            .into_response(),
    }
}
