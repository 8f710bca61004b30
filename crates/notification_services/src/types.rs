/// Errors raised while building or delivering an email.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// The sink was configured with an unusable address or relay.
    #[error("Email configuration error: {0}")]
    Config(String),

    /// The message could not be assembled.
    #[error("Failed to build email: {0}")]
    Build(String),

    /// The SMTP server rejected the message or could not be reached.
    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Connection settings for the SMTP sink.
#[derive(Clone)]
pub struct SmtpSettings {
    /// Relay hostname, e.g. `smtp.gmail.com`.
    pub host: String,
    /// Relay port. 465 selects implicit TLS, any other port STARTTLS.
    pub port: u16,
    /// Account used to authenticate and as the `From` address.
    pub sender: String,
    /// Account password or app password.
    pub password: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("password", &"<redacted>")
            .finish()
    }
}
