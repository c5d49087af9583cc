//! Confirmation email.
//!
//! This module abstracts over how the confirmation is delivered. The server
//! uses [`SmtpNotifier`]; tests use the mock in [`crate::mocks`].

pub mod smtp;

pub use smtp::SmtpNotifier;

use crate::code_image::CodeImage;
use crate::error::NotifyError;
use crate::types::{PaymentStatus, Registration};
use async_trait::async_trait;

/// Subject line of the confirmation email.
pub const CONFIRMATION_SUBJECT: &str = "INFEST 2K25 - Registration Confirmation";

/// Content id of the inline QR image.
pub const QR_CONTENT_ID: &str = "ticket-qr";

/// Sends registration confirmations.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send the confirmation for `registration` to its email address.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - An address is invalid
    /// - The code image cannot be attached
    /// - The relay rejects the message
    async fn send_confirmation(
        &self,
        registration: &Registration,
        code_image: &CodeImage,
    ) -> Result<(), NotifyError>;
}

/// Render the HTML body of the confirmation email.
///
/// Lists every submitted field plus the payment status, and references the
/// QR image by content id.
#[must_use]
pub fn confirmation_html(registration: &Registration) -> String {
    let (status_label, status_info) = match registration.payment_status {
        PaymentStatus::Paid => ("Paid", "Payment completed successfully"),
        PaymentStatus::Pending | PaymentStatus::Failed => {
            ("Payment Pending", "Please complete your payment at the venue")
        }
    };

    let mut rows = vec![
        ("Full Name", escape_html(&registration.name)),
        ("Email", escape_html(&registration.email)),
        ("Phone", escape_html(&registration.phone)),
        ("WhatsApp", escape_html(&registration.whatsapp)),
        ("College", escape_html(&registration.college)),
        ("Year", escape_html(&registration.year)),
        ("Department", escape_html(&registration.department)),
        ("Events", escape_html(&registration.events.join(", "))),
        ("Payment Mode", registration.payment_mode.as_str().to_string()),
    ];
    if let Some(link) = &registration.project_link {
        rows.push(("Project Link", escape_html(link)));
    }
    rows.push(("Payment Status", status_label.to_string()));

    let details: String = rows
        .iter()
        .map(|(label, value)| format!("        <p>{label}: {value}</p>\n"))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{CONFIRMATION_SUBJECT}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">Thank you for registering for INFEST 2K25!</h2>
        <p>Your ticket ID: <b>{ticket_id}</b></p>
{details}        <p>{status_info}</p>
        <p>Show the attached QR code at the event check-in.</p>
        <p><img src="cid:{QR_CONTENT_ID}" alt="Ticket QR code {ticket_id}" width="256" height="256"></p>
    </div>
</body>
</html>
"#,
        ticket_id = registration.ticket_id,
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
