//! Registration store.
//!
//! One document per attendee, looked up by email (the dedupe key) or by
//! gateway payment id. Implementations must enforce uniqueness of both
//! `email` and `ticket_id` so that [`RegistrationStore::insert_if_absent`]
//! is atomic.

pub mod postgres;

pub use postgres::PostgresRegistrationStore;

use crate::error::StoreError;
use crate::types::Registration;
use async_trait::async_trait;

/// Result of an insert-if-absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The document was stored.
    Inserted,
    /// A registration with this email already exists; nothing was written.
    EmailTaken(Registration),
    /// The ticket id is already used by another registration; nothing was written.
    TicketIdTaken,
}

/// Result of marking a payment as captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentUpdate {
    /// A pending registration was moved to paid.
    Updated(Registration),
    /// The registration was already settled (paid or failed) and was left alone.
    AlreadySettled(Registration),
    /// No registration carries this payment id.
    NotFound,
}

/// Persistence for registration documents.
///
/// Implementations are shared across in-flight requests and must be safe
/// for concurrent use.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Find the registration for an email address.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    async fn find_by_email(&self, email: &str) -> Result<Option<Registration>, StoreError>;

    /// Find the registration carrying a gateway payment id.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    async fn find_by_payment_id(&self, payment_id: &str)
    -> Result<Option<Registration>, StoreError>;

    /// Store `registration` unless its email or ticket id is already taken.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails for any other reason.
    async fn insert_if_absent(&self, registration: &Registration)
    -> Result<InsertOutcome, StoreError>;

    /// Move the registration for `payment_id` from pending to paid.
    ///
    /// # Errors
    ///
    /// Returns error if the store is unreachable.
    async fn mark_paid(&self, payment_id: &str) -> Result<PaymentUpdate, StoreError>;
}
