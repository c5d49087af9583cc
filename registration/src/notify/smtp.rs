//! SMTP notifier using Lettre.

use super::{confirmation_html, Notifier, CONFIRMATION_SUBJECT, QR_CONTENT_ID};
use crate::code_image::CodeImage;
use crate::config::SmtpConfig;
use crate::error::NotifyError;
use crate::types::Registration;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Sender used when no account is configured.
const UNCONFIGURED_SENDER: &str = "noreply@infest.invalid";

/// SMTP notifier authenticating against a STARTTLS relay.
///
/// A new connection is opened for every message and closed afterwards.
#[derive(Clone)]
pub struct SmtpNotifier {
    host: String,
    port: u16,
    credentials: Credentials,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Create a notifier from SMTP settings.
    ///
    /// The account username doubles as the sender address. Without one the
    /// notifier is still built, and every send fails at the relay.
    ///
    /// # Errors
    ///
    /// Returns error if the sender address is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let address = if config.username.is_empty() {
            UNCONFIGURED_SENDER
        } else {
            config.username.as_str()
        };
        let from = if config.from_name.is_empty() {
            address.to_string()
        } else {
            format!("{} <{address}>", config.from_name)
        };
        let from = from
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Address(format!("invalid from address {from:?}: {e}")))?;

        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            credentials: Credentials::new(config.username.clone(), config.password.clone()),
            from,
        })
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
        Ok(AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .map_err(|e| NotifyError::Transport(format!("SMTP relay error: {e}")))?
            .port(self.port)
            .credentials(self.credentials.clone())
            .build())
    }

    /// Assemble the confirmation message with the QR image inline.
    ///
    /// # Errors
    ///
    /// Returns error if the recipient is invalid or the message cannot be built.
    pub fn build_message(
        &self,
        registration: &Registration,
        qr_png: Vec<u8>,
    ) -> Result<Message, NotifyError> {
        let to = registration
            .email
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Address(format!("invalid to address: {e}")))?;

        let png = ContentType::parse("image/png")
            .map_err(|e| NotifyError::Build(format!("content type: {e}")))?;
        let qr = Attachment::new_inline(QR_CONTENT_ID.to_string()).body(qr_png, png);

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(CONFIRMATION_SUBJECT)
            .multipart(
                MultiPart::related()
                    .singlepart(SinglePart::html(confirmation_html(registration)))
                    .singlepart(qr),
            )
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_confirmation(
        &self,
        registration: &Registration,
        code_image: &CodeImage,
    ) -> Result<(), NotifyError> {
        let qr_png = code_image
            .read()
            .await
            .map_err(|e| NotifyError::Attachment(e.to_string()))?;

        let message = self.build_message(registration, qr_png)?;
        let mailer = self.build_transport()?;

        mailer
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        tracing::info!(
            ticket_id = %registration.ticket_id,
            to = %registration.email,
            "Confirmation email sent"
        );
        Ok(())
    }
}
