//! Application state for the HTTP server.

use crate::service::RegistrationService;
use crate::webhook::PaymentWebhookHandler;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via `Arc`) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Registration intake
    pub registrations: Arc<RegistrationService>,
    /// Payment webhook reconciliation
    pub webhooks: Arc<PaymentWebhookHandler>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(registrations: RegistrationService, webhooks: PaymentWebhookHandler) -> Self {
        Self {
            registrations: Arc::new(registrations),
            webhooks: Arc::new(webhooks),
        }
    }
}
