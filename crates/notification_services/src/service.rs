use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    address::AddressError,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::types::{NotificationError, SmtpSettings};

/// Outgoing email sink shared by subscriber notifications and admin alerts.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends one plain-text message to every address in `to`.
    ///
    /// Returns an identifier for the delivered message.
    async fn send_email(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> Result<String, NotificationError>;
}

/// Email sink that submits messages to an authenticated SMTP relay.
pub struct SmtpEmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailService {
    /// Creates a new SMTP email service from the relay settings.
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotificationError> {
        let from: Mailbox = settings.sender.parse().map_err(|e: AddressError| {
            NotificationError::Config(format!("Invalid sender address {}: {}", settings.sender, e))
        })?;

        // Port 465 speaks TLS from the first byte, everything else upgrades via STARTTLS.
        let builder = if settings.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .map_err(|e| NotificationError::Config(e.to_string()))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.sender.clone(),
                settings.password.clone(),
            ))
            .build();

        log::debug!(
            "📧 SMTP transport ready for {}:{}",
            settings.host,
            settings.port
        );

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send_email(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> Result<String, NotificationError> {
        if to.is_empty() {
            return Err(NotificationError::Config(
                "at least one recipient is required".to_string(),
            ));
        }

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        for address in to {
            let mailbox: Mailbox = address.parse().map_err(|e: AddressError| {
                NotificationError::Config(format!("Invalid recipient address {}: {}", address, e))
            })?;
            builder = builder.to(mailbox);
        }

        let message = builder
            .body(body.to_string())
            .map_err(|e| NotificationError::Build(e.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Smtp(e.to_string()))?;

        let reply = response.message().collect::<Vec<_>>().join(" ");
        log::info!("📧 Email '{}' sent to {} recipient(s)", subject, to.len());

        Ok(reply)
    }
}

/// Email sink for development that only logs what would have been sent.
pub struct MockEmailService;

#[async_trait]
impl EmailService for MockEmailService {
    async fn send_email(
        &self,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> Result<String, NotificationError> {
        log::info!("📧 [MOCK EMAIL] To: {}", to.join(", "));
        log::info!("📧 [MOCK EMAIL] Subject: {}", subject);
        log::info!("📧 [MOCK EMAIL] Body:\n{}", body);

        Ok(format!("mock-email-{}", uuid::Uuid::new_v4()))
    }
}
