//! Domain types for registration intake.
//!
//! The request body is parsed into [`RegistrationRequest`] at the HTTP boundary
//! and validated into a normalized copy before any handler logic runs. Stored
//! documents are [`Registration`] values.

use crate::error::{FieldError, ValidationErrors};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Payment
// ============================================================================

/// How the attendee intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    /// Paid through the payment gateway before submitting.
    Online,
    /// Paid at the venue.
    Offline,
}

impl PaymentMode {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    /// Parse from the database string.
    ///
    /// Returns `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }

    /// Initial payment status for a new registration.
    ///
    /// Online payments that carry a gateway payment id are trusted as paid.
    /// Everything else starts pending, including offline registrations that
    /// happen to carry a payment id.
    #[must_use]
    pub const fn initial_status(&self, payment_id: Option<&str>) -> PaymentStatus {
        match (self, payment_id) {
            (Self::Online, Some(_)) => PaymentStatus::Paid,
            _ => PaymentStatus::Pending,
        }
    }
}

/// Payment lifecycle of a registration.
///
/// Transitions go only from `Pending` to `Paid` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting payment.
    #[default]
    Pending,
    /// Payment captured.
    Paid,
    /// Payment failed.
    Failed,
}

impl PaymentStatus {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    /// Parse from the database string.
    ///
    /// Returns `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid | Self::Failed)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// Human-facing ticket identifier, `INF25-####`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Prefix shared by every ticket of this edition.
    pub const PREFIX: &'static str = "INF25-";

    /// Build a ticket id from its numeric suffix.
    #[must_use]
    pub fn from_number(number: u16) -> Self {
        Self(format!("{}{number:04}", Self::PREFIX))
    }

    /// Wrap a stored ticket id without checking its shape.
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the text has the `INF25-####` shape.
    #[must_use]
    pub fn is_well_formed(value: &str) -> bool {
        value.strip_prefix(Self::PREFIX).is_some_and(|digits| {
            digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit())
        })
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Request
// ============================================================================

/// Registration submission as sent by the form.
///
/// Fields the server assigns (`ticket_id`, `payment_status`,
/// `registration_time`) are not part of the request; if a client sends them
/// they are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistrationRequest {
    /// Full name
    pub name: String,
    /// Email address, the dedupe key
    pub email: String,
    /// Phone number
    pub phone: String,
    /// `WhatsApp` number
    pub whatsapp: String,
    /// College name
    pub college: String,
    /// Year of study
    pub year: String,
    /// Department
    pub department: String,
    /// Selected events, in form order
    pub events: Vec<String>,
    /// Payment mode
    pub payment_mode: PaymentMode,
    /// Optional project submission link
    #[serde(default)]
    pub project_link: Option<String>,
    /// Gateway payment id (online payments only)
    #[serde(default)]
    pub payment_id: Option<String>,
}

impl RegistrationRequest {
    /// Validate and normalize the request.
    ///
    /// Text fields are trimmed, the email is lower-cased, blank events are
    /// rejected and blank optional fields become `None`.
    ///
    /// # Errors
    ///
    /// Returns every field-level problem found, not just the first.
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();

        let mut required = |field: &'static str, value: String| {
            let value = value.trim().to_string();
            if value.is_empty() {
                errors.push(FieldError::new(field, "must not be empty"));
            }
            value
        };

        let name = required("name", self.name);
        let email = required("email", self.email).to_lowercase();
        let phone = required("phone", self.phone);
        let whatsapp = required("whatsapp", self.whatsapp);
        let college = required("college", self.college);
        let year = required("year", self.year);
        let department = required("department", self.department);

        if !email.is_empty() && !is_plausible_email(&email) {
            errors.push(FieldError::new("email", "must be a valid email address"));
        }

        let events: Vec<String> = self
            .events
            .into_iter()
            .map(|event| event.trim().to_string())
            .collect();
        if events.is_empty() {
            errors.push(FieldError::new("events", "select at least one event"));
        } else if events.iter().any(String::is_empty) {
            errors.push(FieldError::new("events", "event names must not be empty"));
        }

        if !errors.is_empty() {
            return Err(ValidationErrors::new(errors));
        }

        Ok(Self {
            name,
            email,
            phone,
            whatsapp,
            college,
            year,
            department,
            events,
            payment_mode: self.payment_mode,
            project_link: non_blank(self.project_link),
            payment_id: non_blank(self.payment_id),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Basic shape check: one `@`, non-empty local part and a dotted domain.
fn is_plausible_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        _ => false,
    }
}

// ============================================================================
// Stored document
// ============================================================================

/// One stored registration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Store key
    pub id: Uuid,
    /// Full name
    pub name: String,
    /// Email address (lower-cased)
    pub email: String,
    /// Phone number
    pub phone: String,
    /// `WhatsApp` number
    pub whatsapp: String,
    /// College name
    pub college: String,
    /// Year of study
    pub year: String,
    /// Department
    pub department: String,
    /// Selected events
    pub events: Vec<String>,
    /// Optional project link
    pub project_link: Option<String>,
    /// Payment mode
    pub payment_mode: PaymentMode,
    /// Gateway payment id
    pub payment_id: Option<String>,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Ticket identifier, assigned once
    pub ticket_id: TicketId,
    /// Code image reference
    pub qr_code: String,
    /// Insert timestamp
    pub registration_time: DateTime<Utc>,
}

impl Registration {
    /// Build a new document from a validated request.
    #[must_use]
    pub fn new(request: RegistrationRequest, ticket_id: TicketId, qr_code: String) -> Self {
        let payment_status = request
            .payment_mode
            .initial_status(request.payment_id.as_deref());

        Self {
            id: Uuid::new_v4(),
            name: request.name,
            email: request.email,
            phone: request.phone,
            whatsapp: request.whatsapp,
            college: request.college,
            year: request.year,
            department: request.department,
            events: request.events,
            project_link: request.project_link,
            payment_mode: request.payment_mode,
            payment_id: request.payment_id,
            payment_status,
            ticket_id,
            qr_code,
            registration_time: Utc::now(),
        }
    }
}
