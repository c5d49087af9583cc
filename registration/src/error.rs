//! Error types for registration intake and payment reconciliation.
//!
//! Each adapter has its own error enum; [`RegistrationError`] is what the
//! registration service returns so callers can tell causes apart without
//! matching on strings.

use serde::Serialize;
use thiserror::Error;

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Request field name
    pub field: &'static str,
    /// Human-readable problem
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validation failure for a registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid registration: {}", summary(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Wrap a list of field errors.
    #[must_use]
    pub const fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Field errors, in the order they were found.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Registration store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(String),

    /// A stored document could not be decoded.
    #[error("corrupt registration {id}: {reason}")]
    Corrupt {
        /// Registration id
        id: String,
        /// What was wrong
        reason: String,
    },

    /// Migrations failed to apply.
    #[error("migration failed: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Code image generation failure.
#[derive(Debug, Error)]
pub enum CodeImageError {
    /// The ticket id could not be encoded as a QR code.
    #[error("failed to encode QR code: {0}")]
    Encode(String),

    /// The image could not be rendered to PNG.
    #[error("failed to render QR image: {0}")]
    Render(String),

    /// The image file could not be written or read.
    #[error("QR image I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Confirmation email failure.
///
/// Never leaves the registration service; it is only logged and reported
/// as `email_sent: false`.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Sender or recipient address did not parse.
    #[error("invalid address: {0}")]
    Address(String),

    /// The QR attachment could not be loaded.
    #[error("attachment error: {0}")]
    Attachment(String),

    /// The message could not be assembled.
    #[error("failed to build email: {0}")]
    Build(String),

    /// The relay refused or the connection failed.
    #[error("failed to send email: {0}")]
    Transport(String),
}

/// Outcome of a failed registration submission.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Payload failed validation; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// The store rejected or could not perform the write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The code image could not be produced.
    #[error(transparent)]
    CodeImage(#[from] CodeImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_lists_fields() {
        let err = ValidationErrors::new(vec![
            FieldError::new("name", "must not be empty"),
            FieldError::new("events", "select at least one event"),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid registration: name must not be empty; events select at least one event"
        );
    }

    #[test]
    fn test_registration_error_is_transparent() {
        let err = RegistrationError::from(StoreError::Database("connection refused".to_string()));
        assert_eq!(err.to_string(), "database error: connection refused");
    }
}
