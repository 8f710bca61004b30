use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use notification_services::SmtpSettings;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::schedule_parser::HourWindow;

/// Configuration could not be built from the environment
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or blank
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    /// A variable could not be parsed
    #[error("Invalid value for {var}: {reason}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// Parse error
        reason: String,
    },

    /// Values parsed but are inconsistent
    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Everything one checker run needs, read once at start-up
#[derive(Clone, Validate)]
#[validate(schema(function = "validate_checker_config"))]
pub struct CheckerConfig {
    /// Sender address, also the SMTP login
    #[validate(email)]
    pub email_sender: String,
    /// SMTP password
    pub email_password: String,
    /// Subscribers receiving availability emails
    #[validate(length(min = 1, message = "at least one receiver is required"))]
    pub email_receivers: Vec<String>,
    /// Recipient of watchdog alerts
    #[validate(email)]
    pub admin_email: String,
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP relay port
    pub smtp_port: u16,
    /// Subject of availability emails
    pub email_subject: String,
    /// Text placed before the slot list
    pub availability_update_message: String,
    /// Schedule URL prefix; the date is appended
    #[validate(length(min = 1))]
    pub base_url: String,
    /// State file of the previous run
    pub availability_file: PathBuf,
    /// Error run log, read by the watchdog
    pub error_log_path: PathBuf,
    /// Info run log
    pub info_log_path: PathBuf,
    /// First hour reported
    #[validate(range(max = 24))]
    pub from_hour: u32,
    /// First hour no longer reported
    #[validate(range(max = 24))]
    pub to_hour: u32,
    /// Number of days scanned, starting today
    #[validate(range(min = 1))]
    pub look_ahead_days: u32,
    /// Watchdog alerts above this many errors in 24 hours
    pub error_threshold: usize,
    /// Pause before every schedule request
    pub request_delay: Duration,
    /// Resource name used in slot identifiers
    #[validate(length(min = 1))]
    pub resource_label: String,
    /// Log emails instead of sending them
    pub mock_email: bool,
}

impl CheckerConfig {
    /// Read the configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup` and validate it
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };
        let optional =
            |var: &str, default: &str| lookup(var).unwrap_or_else(|| default.to_string());

        let mock_email = parse_var(&lookup, "CHECKER_MOCK_EMAIL", false)?;
        let email_password = if mock_email {
            lookup("EMAIL_PASSWORD").unwrap_or_default()
        } else {
            required("EMAIL_PASSWORD")?
        };

        let email_receivers = required("EMAIL_RECEIVERS")?
            .split(',')
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .collect();

        let config = Self {
            email_sender: required("EMAIL_SENDER")?,
            email_password,
            email_receivers,
            admin_email: required("ADMIN_EMAIL")?,
            smtp_host: optional("SMTP_HOST", "smtp.gmail.com"),
            smtp_port: parse_var(&lookup, "SMTP_PORT", 465)?,
            email_subject: optional("EMAIL_SUBJECT", "New court availability"),
            availability_update_message: optional(
                "AVAILABILITY_UPDATE_MESSAGE",
                "New slots are available:\n\n",
            ),
            base_url: required("BASE_URL")?,
            availability_file: optional("AVAILABILITY_FILE", "availability.json").into(),
            error_log_path: optional("ERROR_LOG_PATH", "error.log").into(),
            info_log_path: optional("INFO_LOG_PATH", "info.log").into(),
            from_hour: parse_var(&lookup, "FROM_HOUR", 17)?,
            to_hour: parse_var(&lookup, "TO_HOUR", 22)?,
            look_ahead_days: parse_var(&lookup, "LOOK_AHEAD_DAYS", 6)?,
            error_threshold: parse_var(&lookup, "ERROR_THRESHOLD", 10)?,
            request_delay: Duration::from_secs(parse_var(&lookup, "REQUEST_DELAY_SECS", 5)?),
            resource_label: optional("RESOURCE_LABEL", "Court"),
            mock_email,
        };

        config.validate()?;
        Ok(config)
    }

    /// Hours of the day worth reporting
    pub fn hour_window(&self) -> HourWindow {
        HourWindow {
            from_hour: self.from_hour,
            to_hour: self.to_hour,
        }
    }

    /// Settings for the SMTP email sink
    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            sender: self.email_sender.clone(),
            password: self.email_password.clone(),
        }
    }
}

impl fmt::Debug for CheckerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckerConfig")
            .field("email_sender", &self.email_sender)
            .field("email_password", &"<redacted>")
            .field("email_receivers", &self.email_receivers)
            .field("admin_email", &self.admin_email)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("base_url", &self.base_url)
            .field("availability_file", &self.availability_file)
            .field("error_log_path", &self.error_log_path)
            .field("info_log_path", &self.info_log_path)
            .field("from_hour", &self.from_hour)
            .field("to_hour", &self.to_hour)
            .field("look_ahead_days", &self.look_ahead_days)
            .field("error_threshold", &self.error_threshold)
            .field("request_delay", &self.request_delay)
            .field("mock_email", &self.mock_email)
            .finish_non_exhaustive()
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: format!("'{}': {}", value, e),
        }),
    }
}

fn validate_checker_config(config: &CheckerConfig) -> Result<(), ValidationError> {
    if config.from_hour >= config.to_hour {
        return Err(ValidationError::new("hour_window")
            .with_message("FROM_HOUR must be lower than TO_HOUR".into()));
    }
    if !config
        .email_receivers
        .iter()
        .all(|address| address.validate_email())
    {
        return Err(ValidationError::new("email_receivers")
            .with_message("every receiver must be an email address".into()));
    }
    Ok(())
}
