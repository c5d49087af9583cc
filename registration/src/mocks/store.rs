//! In-memory registration store.

use crate::error::StoreError;
use crate::store::{InsertOutcome, PaymentUpdate, RegistrationStore};
use crate::types::{PaymentStatus, Registration};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// In-memory registration store.
///
/// Enforces the same uniqueness rules as the `PostgreSQL` store. Can be
/// switched into a failing mode to simulate an unreachable database.
#[derive(Debug, Default)]
pub struct InMemoryRegistrationStore {
    registrations: RwLock<Vec<Registration>>,
    unavailable: AtomicBool,
}

impl InMemoryRegistrationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of every stored registration, in insert order.
    pub async fn all(&self) -> Vec<Registration> {
        self.registrations.read().await.clone()
    }

    /// Number of stored registrations.
    pub async fn len(&self) -> usize {
        self.registrations.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.registrations.read().await.is_empty()
    }

    /// Insert without uniqueness checks, for seeding fixtures.
    pub async fn seed(&self, registration: Registration) {
        self.registrations.write().await.push(registration);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Database("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Registration>, StoreError> {
        self.check()?;
        Ok(self
            .registrations
            .read()
            .await
            .iter()
            .find(|r| r.email == email)
            .cloned())
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<Registration>, StoreError> {
        self.check()?;
        Ok(self
            .registrations
            .read()
            .await
            .iter()
            .find(|r| r.payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    async fn insert_if_absent(
        &self,
        registration: &Registration,
    ) -> Result<InsertOutcome, StoreError> {
        self.check()?;
        let mut registrations = self.registrations.write().await;

        if let Some(existing) = registrations.iter().find(|r| r.email == registration.email) {
            return Ok(InsertOutcome::EmailTaken(existing.clone()));
        }
        if registrations
            .iter()
            .any(|r| r.ticket_id == registration.ticket_id)
        {
            return Ok(InsertOutcome::TicketIdTaken);
        }

        registrations.push(registration.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn mark_paid(&self, payment_id: &str) -> Result<PaymentUpdate, StoreError> {
        self.check()?;
        let mut registrations = self.registrations.write().await;

        let Some(registration) = registrations
            .iter_mut()
            .find(|r| r.payment_id.as_deref() == Some(payment_id))
        else {
            return Ok(PaymentUpdate::NotFound);
        };

        if registration
            .payment_status
            .can_transition_to(PaymentStatus::Paid)
        {
            registration.payment_status = PaymentStatus::Paid;
            Ok(PaymentUpdate::Updated(registration.clone()))
        } else {
            Ok(PaymentUpdate::AlreadySettled(registration.clone()))
        }
    }
}
