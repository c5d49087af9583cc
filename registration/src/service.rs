//! Registration service.
//!
//! Orchestrates one submission: validate, dedupe on email, issue a ticket and
//! its QR code, persist, then try to send the confirmation email.
//!
//! # Flow
//!
//! ```text
//! request ──validate──► find_by_email ──hit──► Existing (email_sent = false)
//!                            │
//!                           miss
//!                            ▼
//!            ticket id ─► QR image ─► insert_if_absent ─► email ─► Created
//!                ▲                          │
//!                └──── ticket id taken ─────┘
//! ```

use crate::code_image::{CodeImage, QrCodeGenerator};
use crate::error::{RegistrationError, StoreError};
use crate::metrics;
use crate::notify::Notifier;
use crate::store::{InsertOutcome, RegistrationStore};
use crate::ticket::{self, TicketGenerator};
use crate::types::{PaymentStatus, Registration, RegistrationRequest};
use std::sync::Arc;

/// Ticket ids tried before giving up on a collision streak.
pub const MAX_TICKET_ATTEMPTS: usize = 5;

/// Successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A new registration was stored.
    Created {
        /// The stored document
        registration: Registration,
        /// Whether the confirmation email went out
        email_sent: bool,
    },
    /// The email was already registered; nothing changed and no email was sent.
    Existing(Registration),
}

impl RegistrationOutcome {
    /// The registration the caller should be told about.
    #[must_use]
    pub const fn registration(&self) -> &Registration {
        match self {
            Self::Created { registration, .. } | Self::Existing(registration) => registration,
        }
    }

    /// Whether a confirmation email was sent for this submission.
    #[must_use]
    pub const fn email_sent(&self) -> bool {
        match self {
            Self::Created { email_sent, .. } => *email_sent,
            Self::Existing(_) => false,
        }
    }

    /// Payment status of the registration.
    #[must_use]
    pub const fn payment_status(&self) -> PaymentStatus {
        self.registration().payment_status
    }
}

/// Handles registration submissions.
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn RegistrationStore>,
    codes: QrCodeGenerator,
    notifier: Arc<dyn Notifier>,
    tickets: TicketGenerator,
}

impl RegistrationService {
    /// Create a service with the random ticket generator.
    #[must_use]
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        codes: QrCodeGenerator,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            codes,
            notifier,
            tickets: ticket::random_generator(),
        }
    }

    /// Replace the ticket generator.
    #[must_use]
    pub fn with_ticket_generator(mut self, tickets: TicketGenerator) -> Self {
        self.tickets = tickets;
        self
    }

    /// Submit a registration.
    ///
    /// Re-submitting an email that is already registered returns the stored
    /// ticket instead of creating a second document.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::Validation`] before any side effect
    /// - [`RegistrationError::CodeImage`] if the QR file cannot be written
    /// - [`RegistrationError::Store`] if the store fails; a QR file already
    ///   written for the attempt is left on disk
    #[tracing::instrument(skip_all, fields(email = %request.email))]
    pub async fn submit(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let request = request.validate().inspect_err(|e| {
            tracing::debug!(error = %e, "Registration rejected");
            metrics::record_registration("invalid");
        })?;

        let result = self.register(request).await;
        match &result {
            Ok(RegistrationOutcome::Created { .. }) => metrics::record_registration("created"),
            Ok(RegistrationOutcome::Existing(_)) => metrics::record_registration("duplicate"),
            Err(_) => metrics::record_registration("failed"),
        }
        result
    }

    async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        if let Some(existing) = self.store.find_by_email(&request.email).await? {
            tracing::info!(
                ticket_id = %existing.ticket_id,
                "Email already registered, returning existing ticket"
            );
            return Ok(RegistrationOutcome::Existing(existing));
        }

        for attempt in 1..=MAX_TICKET_ATTEMPTS {
            let ticket_id = (self.tickets)();
            let image = self.codes.generate(&ticket_id).await?;
            let registration = Registration::new(request.clone(), ticket_id, image.reference.clone());

            match self.store.insert_if_absent(&registration).await? {
                InsertOutcome::Inserted => {
                    tracing::info!(
                        ticket_id = %registration.ticket_id,
                        payment_status = %registration.payment_status,
                        "Registration stored"
                    );
                    let email_sent = self.notify(&registration, &image).await;
                    return Ok(RegistrationOutcome::Created {
                        registration,
                        email_sent,
                    });
                }
                InsertOutcome::EmailTaken(existing) => {
                    tracing::info!(
                        ticket_id = %existing.ticket_id,
                        "Concurrent registration won the race, returning its ticket"
                    );
                    return Ok(RegistrationOutcome::Existing(existing));
                }
                InsertOutcome::TicketIdTaken => {
                    tracing::warn!(
                        ticket_id = %registration.ticket_id,
                        attempt,
                        "Ticket id collision, regenerating"
                    );
                }
            }
        }

        Err(StoreError::Database(format!(
            "no free ticket id after {MAX_TICKET_ATTEMPTS} attempts"
        ))
        .into())
    }

    /// Send the confirmation, reporting failure as `false`.
    async fn notify(&self, registration: &Registration, image: &CodeImage) -> bool {
        let sent = match self.notifier.send_confirmation(registration, image).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    ticket_id = %registration.ticket_id,
                    error = %e,
                    "Confirmation email failed"
                );
                false
            }
        };
        metrics::record_email(sent);
        sent
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{InMemoryRegistrationStore, MockNotifier};
    use crate::store::PaymentUpdate;
    use crate::ticket::sequence_generator;
    use crate::types::{PaymentMode, TicketId};
    use async_trait::async_trait;

    /// Store whose email lookup misses, as if a concurrent submission
    /// committed between the lookup and the insert.
    struct LateCommitStore {
        inner: Arc<InMemoryRegistrationStore>,
    }

    #[async_trait]
    impl RegistrationStore for LateCommitStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<Registration>, StoreError> {
            Ok(None)
        }

        async fn find_by_payment_id(
            &self,
            payment_id: &str,
        ) -> Result<Option<Registration>, StoreError> {
            self.inner.find_by_payment_id(payment_id).await
        }

        async fn insert_if_absent(
            &self,
            registration: &Registration,
        ) -> Result<InsertOutcome, StoreError> {
            self.inner.insert_if_absent(registration).await
        }

        async fn mark_paid(&self, payment_id: &str) -> Result<PaymentUpdate, StoreError> {
            self.inner.mark_paid(payment_id).await
        }
    }

    struct Harness {
        store: Arc<InMemoryRegistrationStore>,
        notifier: Arc<MockNotifier>,
        service: RegistrationService,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryRegistrationStore::new());
        let notifier = Arc::new(MockNotifier::new());
        let service = RegistrationService::new(
            store.clone(),
            QrCodeGenerator::new(dir.path().join("qrcodes")),
            notifier.clone(),
        );
        Harness {
            store,
            notifier,
            service,
            _dir: dir,
        }
    }

    fn request(email: &str) -> RegistrationRequest {
        RegistrationRequest {
            name: "A".to_string(),
            email: email.to_string(),
            phone: "9000000001".to_string(),
            whatsapp: "9000000001".to_string(),
            college: "GEC".to_string(),
            year: "2".to_string(),
            department: "IT".to_string(),
            events: vec!["hack".to_string()],
            payment_mode: PaymentMode::Offline,
            project_link: None,
            payment_id: None,
        }
    }

    #[tokio::test]
    async fn test_new_email_creates_registration_and_sends_email() {
        let h = harness();

        let outcome = h.service.submit(request("a@x.com")).await.unwrap();

        let registration = outcome.registration();
        assert!(TicketId::is_well_formed(registration.ticket_id.as_str()));
        assert!(outcome.email_sent());
        assert_eq!(outcome.payment_status(), PaymentStatus::Pending);
        assert!(registration
            .qr_code
            .ends_with(&format!("qrcodes/{}.png", registration.ticket_id)));
        assert!(std::path::Path::new(&registration.qr_code).exists());
        assert_eq!(h.store.len().await, 1);

        let sent = h.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert_eq!(sent[0].ticket_id, registration.ticket_id);
    }

    #[tokio::test]
    async fn test_duplicate_email_returns_original_ticket() {
        let h = harness();
        let first = h.service.submit(request("a@x.com")).await.unwrap();
        let second = h.service.submit(request("  A@X.com ")).await.unwrap();

        assert!(matches!(second, RegistrationOutcome::Existing(_)));
        assert_eq!(
            first.registration().ticket_id,
            second.registration().ticket_id
        );
        assert_eq!(first.registration().qr_code, second.registration().qr_code);
        assert!(!second.email_sent());
        assert_eq!(h.store.len().await, 1);
        assert_eq!(h.notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_online_with_payment_id_is_paid() {
        let h = harness();
        let mut req = request("b@x.com");
        req.payment_mode = PaymentMode::Online;
        req.payment_id = Some("pay_123".to_string());

        let outcome = h.service.submit(req).await.unwrap();
        assert_eq!(outcome.payment_status(), PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_offline_with_payment_id_stays_pending() {
        let h = harness();
        let mut req = request("c@x.com");
        req.payment_id = Some("pay_123".to_string());

        let outcome = h.service.submit(req).await.unwrap();
        assert_eq!(outcome.payment_status(), PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_email_failure_does_not_fail_registration() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryRegistrationStore::new());
        let service = RegistrationService::new(
            store.clone(),
            QrCodeGenerator::new(dir.path()),
            Arc::new(MockNotifier::failing()),
        );

        let outcome = service.submit(request("d@x.com")).await.unwrap();

        assert!(matches!(outcome, RegistrationOutcome::Created { .. }));
        assert!(!outcome.email_sent());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_losing_a_concurrent_insert_returns_winner() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(InMemoryRegistrationStore::new());
        let winner = Registration::new(
            request("k@x.com").validate().unwrap(),
            TicketId::from_number(7777),
            "qrcodes/INF25-7777.png".to_string(),
        );
        inner.seed(winner.clone()).await;

        let notifier = Arc::new(MockNotifier::new());
        let service = RegistrationService::new(
            Arc::new(LateCommitStore {
                inner: inner.clone(),
            }),
            QrCodeGenerator::new(dir.path()),
            notifier.clone(),
        );

        let outcome = service.submit(request("K@x.com")).await.unwrap();

        assert_eq!(outcome, RegistrationOutcome::Existing(winner));
        assert!(!outcome.email_sent());
        assert!(notifier.sent().await.is_empty());
        assert_eq!(inner.len().await, 1);
    }

    #[tokio::test]
    async fn test_validation_failure_has_no_side_effects() {
        let h = harness();
        let mut req = request("e@x.com");
        req.events.clear();

        let err = h.service.submit(req).await.unwrap_err();

        assert!(matches!(err, RegistrationError::Validation(_)));
        assert!(h.store.is_empty().await);
        assert!(h.notifier.sent().await.is_empty());
        assert!(!h.service.codes.dir().exists());
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let h = harness();
        h.store.set_unavailable(true);

        let err = h.service.submit(request("f@x.com")).await.unwrap_err();

        assert!(matches!(err, RegistrationError::Store(_)));
        assert!(h.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_ticket_collision_is_regenerated() {
        let h = harness();
        let taken = TicketId::from_number(1234);
        let service = h.service.clone().with_ticket_generator(sequence_generator(vec![
            taken.clone(),
            taken.clone(),
            TicketId::from_number(5678),
        ]));

        let first = service.submit(request("g@x.com")).await.unwrap();
        let second = service.submit(request("h@x.com")).await.unwrap();

        assert_eq!(first.registration().ticket_id, taken);
        assert_eq!(second.registration().ticket_id.as_str(), "INF25-5678");
        assert_eq!(h.store.len().await, 2);
    }

    #[tokio::test]
    async fn test_collision_streak_gives_up() {
        let h = harness();
        let taken = TicketId::from_number(4242);
        let service = h
            .service
            .clone()
            .with_ticket_generator(Arc::new(move || taken.clone()));

        service.submit(request("i@x.com")).await.unwrap();
        let err = service.submit(request("j@x.com")).await.unwrap_err();

        assert!(matches!(err, RegistrationError::Store(_)));
        assert_eq!(h.store.len().await, 1);
    }
}
