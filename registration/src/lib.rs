//! # INFEST 2K25 Registration Backend
//!
//! Registration intake and payment reconciliation for the INFEST 2K25
//! college technical festival.
//!
//! ## Features
//!
//! - **Idempotent intake**: one registration per email, re-submissions get
//!   the stored ticket back
//! - **Tickets**: `INF25-NNNN` identifiers with a QR code image per ticket
//! - **Confirmation email**: HTML body with the QR code attached inline
//! - **Payment webhook**: reconciles captured payments against stored
//!   registrations
//!
//! ## Architecture
//!
//! ```text
//! POST /register ─► RegistrationService ─► RegistrationStore (Postgres)
//!                          │           └─► QrCodeGenerator (filesystem)
//!                          └─► Notifier (SMTP)
//!
//! POST /webhook  ─► PaymentWebhookHandler ─► RegistrationStore
//! ```
//!
//! Store and notifier sit behind traits so the service runs against the
//! in-memory doubles in [`mocks`] during tests.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod code_image;
pub mod config;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod server;
pub mod service;
pub mod store;
pub mod ticket;
pub mod types;
pub mod webhook;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use code_image::{CodeImage, QrCodeGenerator};
pub use config::Config;
pub use error::{RegistrationError, StoreError, ValidationErrors};
pub use service::{RegistrationOutcome, RegistrationService};
pub use store::{PostgresRegistrationStore, RegistrationStore};
pub use types::{PaymentMode, PaymentStatus, Registration, RegistrationRequest, TicketId};
pub use webhook::{PaymentWebhookHandler, WebhookAck, WebhookEnvelope};
