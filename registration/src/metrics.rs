//! Business metrics for registration intake.
//!
//! # Exported Metrics
//!
//! - `infest_registrations_total{outcome}` - created, duplicate, invalid, failed
//! - `infest_emails_total{outcome}` - sent, failed
//! - `infest_webhook_events_total{outcome}` - webhook acknowledgement status

use metrics::describe_counter;

/// Register metric descriptions. Call once at startup.
pub fn register_metrics() {
    describe_counter!(
        "infest_registrations_total",
        "Registration submissions by outcome (created, duplicate, invalid, failed)"
    );
    describe_counter!(
        "infest_emails_total",
        "Confirmation emails by outcome (sent, failed)"
    );
    describe_counter!(
        "infest_webhook_events_total",
        "Payment webhook events by acknowledgement status"
    );

    tracing::info!("Registration metrics registered");
}

/// Record a registration submission outcome.
pub fn record_registration(outcome: &'static str) {
    metrics::counter!("infest_registrations_total", "outcome" => outcome).increment(1);
}

/// Record a confirmation email attempt.
pub fn record_email(sent: bool) {
    let outcome = if sent { "sent" } else { "failed" };
    metrics::counter!("infest_emails_total", "outcome" => outcome).increment(1);
}

/// Record a webhook acknowledgement.
pub fn record_webhook(status: &'static str) {
    metrics::counter!("infest_webhook_events_total", "outcome" => status).increment(1);
}
