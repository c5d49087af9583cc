//! Payment gateway webhook reconciliation.
//!
//! The gateway posts Razorpay-style envelopes:
//!
//! ```json
//! {
//!   "event": "payment.captured",
//!   "payload": { "payment": { "entity": { "id": "pay_29QQoUBi66xm2f", "amount": 50000 } } }
//! }
//! ```
//!
//! Only `payment.captured` mutates anything. Every other outcome is still
//! acknowledged with a 2xx so the gateway stops retrying; the acknowledgement
//! status tells "nothing matched" apart from a real failure.
//!
//! No signature verification is performed. The trust boundary is the
//! gateway's network origin.

use crate::error::StoreError;
use crate::metrics;
use crate::store::{PaymentUpdate, RegistrationStore};
use crate::types::PaymentStatus;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Event type for a captured payment.
pub const PAYMENT_CAPTURED: &str = "payment.captured";

/// Gateway event envelope.
///
/// Only `event` is required. The payload stays untyped until the event is
/// known to be one this service acts on, so a payload shaped for some other
/// event never fails to parse.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookEnvelope {
    /// Event type, e.g. `payment.captured`
    pub event: String,
    /// Event payload
    #[serde(default)]
    pub payload: Value,
}

/// Payment entity reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEntity {
    /// Gateway payment id, trimmed and non-empty
    pub id: String,
    /// Amount in the smallest currency unit (paise)
    pub amount: Option<i64>,
    /// Currency code
    pub currency: Option<String>,
}

impl WebhookEnvelope {
    /// The payment entity at `payload.payment.entity`, if it carries an id.
    ///
    /// `amount` is accepted as a number or a numeric string; anything else
    /// is treated as absent.
    #[must_use]
    pub fn payment(&self) -> Option<PaymentEntity> {
        let entity = self.payload.pointer("/payment/entity")?;
        let id = entity.get("id").and_then(Value::as_str)?.trim();
        if id.is_empty() {
            return None;
        }

        Some(PaymentEntity {
            id: id.to_string(),
            amount: entity.get("amount").and_then(lenient_amount),
            currency: entity
                .get("currency")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

fn lenient_amount(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// How a webhook event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAck {
    /// A pending registration was marked paid.
    Recorded {
        /// Gateway payment id
        payment_id: String,
    },
    /// The matching registration was already paid.
    AlreadyRecorded {
        /// Gateway payment id
        payment_id: String,
    },
    /// The matching registration is settled as failed and was not changed.
    Settled {
        /// Gateway payment id
        payment_id: String,
        /// Status the registration keeps
        status: PaymentStatus,
    },
    /// No registration carries this payment id.
    Unmatched {
        /// Gateway payment id
        payment_id: String,
    },
    /// The event type is not one this service acts on.
    Ignored {
        /// Event type received
        event: String,
    },
    /// A captured event without a usable payment entity.
    Invalid {
        /// What was missing
        reason: String,
    },
}

impl WebhookAck {
    /// Stable status string for the response body.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Recorded { .. } | Self::AlreadyRecorded { .. } => "success",
            Self::Settled { .. } | Self::Unmatched { .. } => "warning",
            Self::Ignored { .. } => "ignored",
            Self::Invalid { .. } => "invalid",
        }
    }

    /// Human-readable message for the response body.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Recorded { .. } => "Payment recorded and database updated".to_string(),
            Self::AlreadyRecorded { .. } => "Payment already recorded".to_string(),
            Self::Settled { status, .. } => {
                format!("Payment received but registration is already {status}")
            }
            Self::Unmatched { .. } => {
                "Payment recorded but no matching registration found".to_string()
            }
            Self::Ignored { event } => format!("Unhandled event: {event}"),
            Self::Invalid { reason } => format!("Invalid event: {reason}"),
        }
    }
}

/// Reconciles gateway events against stored registrations.
#[derive(Clone)]
pub struct PaymentWebhookHandler {
    store: Arc<dyn RegistrationStore>,
}

impl PaymentWebhookHandler {
    /// Create a handler over the registration store.
    #[must_use]
    pub fn new(store: Arc<dyn RegistrationStore>) -> Self {
        Self { store }
    }

    /// Handle one gateway event.
    ///
    /// # Errors
    ///
    /// Returns error only if the store is unreachable.
    #[tracing::instrument(skip_all, fields(event = %envelope.event))]
    pub async fn handle(&self, envelope: &WebhookEnvelope) -> Result<WebhookAck, StoreError> {
        let result = self.reconcile(envelope).await;
        match &result {
            Ok(ack) => metrics::record_webhook(ack.status()),
            Err(e) => {
                tracing::error!(error = %e, "Database error while updating payment");
                metrics::record_webhook("error");
            }
        }
        result
    }

    async fn reconcile(&self, envelope: &WebhookEnvelope) -> Result<WebhookAck, StoreError> {
        if envelope.event != PAYMENT_CAPTURED {
            tracing::debug!("Ignoring unhandled webhook event");
            return Ok(WebhookAck::Ignored {
                event: envelope.event.clone(),
            });
        }

        let Some(payment) = envelope.payment() else {
            tracing::warn!("Captured event without a payment id");
            return Ok(WebhookAck::Invalid {
                reason: "missing payload.payment.entity.id".to_string(),
            });
        };
        let amount = payment.amount.map(format_rupees).unwrap_or_default();
        let currency = payment.currency.unwrap_or_default();
        let payment_id = payment.id;

        Ok(match self.store.mark_paid(&payment_id).await? {
            PaymentUpdate::Updated(registration) => {
                tracing::info!(
                    payment_id = %payment_id,
                    amount = %amount,
                    currency = %currency,
                    ticket_id = %registration.ticket_id,
                    "Payment successful, registration marked paid"
                );
                WebhookAck::Recorded { payment_id }
            }
            PaymentUpdate::AlreadySettled(registration)
                if registration.payment_status == PaymentStatus::Paid =>
            {
                tracing::info!(payment_id = %payment_id, "Payment already recorded");
                WebhookAck::AlreadyRecorded { payment_id }
            }
            PaymentUpdate::AlreadySettled(registration) => {
                tracing::warn!(
                    payment_id = %payment_id,
                    status = %registration.payment_status,
                    "Payment received for a settled registration, leaving it unchanged"
                );
                WebhookAck::Settled {
                    payment_id,
                    status: registration.payment_status,
                }
            }
            PaymentUpdate::NotFound => {
                tracing::warn!(
                    payment_id = %payment_id,
                    amount = %amount,
                    currency = %currency,
                    "Payment received but no matching registration found"
                );
                WebhookAck::Unmatched { payment_id }
            }
        })
    }
}

/// Format an amount in paise as rupees, e.g. `50050` → `₹500.50`.
#[must_use]
pub fn format_rupees(paise: i64) -> String {
    let sign = if paise < 0 { "-" } else { "" };
    let abs = paise.unsigned_abs();
    format!("{sign}₹{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::InMemoryRegistrationStore;
    use crate::types::{PaymentMode, Registration, TicketId};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn registration(payment_id: &str, status: PaymentStatus) -> Registration {
        Registration {
            id: Uuid::new_v4(),
            name: "A".to_string(),
            email: format!("{payment_id}@x.com"),
            phone: "1".to_string(),
            whatsapp: "1".to_string(),
            college: "C".to_string(),
            year: "1".to_string(),
            department: "D".to_string(),
            events: vec!["hack".to_string()],
            project_link: None,
            payment_mode: PaymentMode::Online,
            payment_id: Some(payment_id.to_string()),
            payment_status: status,
            ticket_id: TicketId::from_number(1001),
            qr_code: "qrcodes/INF25-1001.png".to_string(),
            registration_time: Utc::now(),
        }
    }

    fn captured(payment_id: &str) -> WebhookEnvelope {
        serde_json::from_value(json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": { "id": payment_id, "amount": 50000, "currency": "INR" } } }
        }))
        .unwrap()
    }

    async fn handler_with(seed: Vec<Registration>) -> (Arc<InMemoryRegistrationStore>, PaymentWebhookHandler) {
        let store = Arc::new(InMemoryRegistrationStore::new());
        for r in seed {
            store.seed(r).await;
        }
        let handler = PaymentWebhookHandler::new(store.clone());
        (store, handler)
    }

    #[tokio::test]
    async fn test_captured_marks_pending_registration_paid() {
        let (store, handler) = handler_with(vec![registration("pay_1", PaymentStatus::Pending)]).await;

        let ack = handler.handle(&captured("pay_1")).await.unwrap();

        assert_eq!(ack.status(), "success");
        assert_eq!(ack.message(), "Payment recorded and database updated");
        assert_eq!(store.all().await[0].payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_captured_twice_is_still_success() {
        let (_, handler) = handler_with(vec![registration("pay_1", PaymentStatus::Pending)]).await;

        handler.handle(&captured("pay_1")).await.unwrap();
        let ack = handler.handle(&captured("pay_1")).await.unwrap();

        assert!(matches!(ack, WebhookAck::AlreadyRecorded { .. }));
        assert_eq!(ack.status(), "success");
    }

    #[tokio::test]
    async fn test_failed_registration_is_not_reversed() {
        let (store, handler) = handler_with(vec![registration("pay_1", PaymentStatus::Failed)]).await;

        let ack = handler.handle(&captured("pay_1")).await.unwrap();

        assert_eq!(ack.status(), "warning");
        assert_eq!(store.all().await[0].payment_status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_unmatched_payment_is_a_warning() {
        let (store, handler) = handler_with(vec![registration("pay_1", PaymentStatus::Pending)]).await;

        let ack = handler.handle(&captured("pay_unknown")).await.unwrap();

        assert_eq!(
            ack,
            WebhookAck::Unmatched {
                payment_id: "pay_unknown".to_string()
            }
        );
        assert_eq!(ack.status(), "warning");
        assert_eq!(store.all().await[0].payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_other_events_are_ignored() {
        let (store, handler) = handler_with(vec![registration("pay_1", PaymentStatus::Pending)]).await;
        let envelope: WebhookEnvelope = serde_json::from_value(json!({
            "event": "payment.failed",
            "payload": { "payment": { "entity": { "id": "pay_1" } } }
        }))
        .unwrap();

        let ack = handler.handle(&envelope).await.unwrap();

        assert_eq!(ack.status(), "ignored");
        assert_eq!(ack.message(), "Unhandled event: payment.failed");
        assert_eq!(store.all().await[0].payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_captured_without_entity_is_invalid() {
        let (_, handler) = handler_with(Vec::new()).await;
        let envelope: WebhookEnvelope =
            serde_json::from_value(json!({ "event": "payment.captured" })).unwrap();

        let ack = handler.handle(&envelope).await.unwrap();

        assert_eq!(ack.status(), "invalid");
    }

    #[tokio::test]
    async fn test_store_outage_is_an_error() {
        let (store, handler) = handler_with(Vec::new()).await;
        store.set_unavailable(true);

        assert!(handler.handle(&captured("pay_1")).await.is_err());
    }

    #[tokio::test]
    async fn test_captured_without_id_is_invalid() {
        let (_, handler) = handler_with(Vec::new()).await;
        let envelope: WebhookEnvelope = serde_json::from_value(json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": { "amount": 100 } } }
        }))
        .unwrap();

        let ack = handler.handle(&envelope).await.unwrap();

        assert_eq!(ack.status(), "invalid");
    }

    #[test]
    fn test_foreign_payload_shapes_still_parse() {
        let refund: WebhookEnvelope = serde_json::from_value(json!({
            "event": "refund.processed",
            "payload": { "payment": {} }
        }))
        .unwrap();
        assert_eq!(refund.payment(), None);

        let failed: WebhookEnvelope = serde_json::from_value(json!({
            "event": "payment.failed",
            "payload": { "payment": { "entity": { "id": "pay_1", "amount": "100" } } }
        }))
        .unwrap();
        assert_eq!(failed.payment().unwrap().amount, Some(100));
    }

    #[test]
    fn test_payment_entity_is_read_leniently() {
        let envelope: WebhookEnvelope = serde_json::from_value(json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": {
                "id": "  pay_9 ", "amount": { "value": 1 }, "currency": "INR"
            } } }
        }))
        .unwrap();

        assert_eq!(
            envelope.payment(),
            Some(PaymentEntity {
                id: "pay_9".to_string(),
                amount: None,
                currency: Some("INR".to_string()),
            })
        );
    }

    #[test]
    fn test_format_rupees() {
        assert_eq!(format_rupees(50000), "₹500.00");
        assert_eq!(format_rupees(50050), "₹500.50");
        assert_eq!(format_rupees(5), "₹0.05");
        assert_eq!(format_rupees(-150), "-₹1.50");
    }
}
