//! Mock notifier for testing.

use crate::code_image::CodeImage;
use crate::error::NotifyError;
use crate::notify::Notifier;
use crate::types::{Registration, TicketId};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// A confirmation the mock accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentConfirmation {
    /// Recipient address
    pub to: String,
    /// Ticket in the message
    pub ticket_id: TicketId,
    /// Code image reference that was attached
    pub qr_code: String,
}

/// Mock notifier.
///
/// Records every confirmation instead of sending it. When set to fail, every
/// send returns a transport error.
#[derive(Debug)]
pub struct MockNotifier {
    should_succeed: AtomicBool,
    sent: Mutex<Vec<SentConfirmation>>,
}

impl MockNotifier {
    /// Create a mock notifier that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            should_succeed: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock notifier whose sends always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            should_succeed: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Switch between succeeding and failing.
    pub fn set_should_succeed(&self, should_succeed: bool) {
        self.should_succeed.store(should_succeed, Ordering::SeqCst);
    }

    /// Confirmations accepted so far.
    pub async fn sent(&self) -> Vec<SentConfirmation> {
        self.sent.lock().await.clone()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_confirmation(
        &self,
        registration: &Registration,
        code_image: &CodeImage,
    ) -> Result<(), NotifyError> {
        if !self.should_succeed.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("mock relay refused".to_string()));
        }
        self.sent.lock().await.push(SentConfirmation {
            to: registration.email.clone(),
            ticket_id: registration.ticket_id.clone(),
            qr_code: code_image.reference.clone(),
        });
        Ok(())
    }
}
