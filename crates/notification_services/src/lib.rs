//! # Notification Services
//!
//! This crate provides the outgoing email sinks used by the availability checker.
//! It includes the [`EmailService`] seam, an SMTP implementation and a logging mock.

/// Email sink trait and its SMTP and mock implementations.
pub mod service;
/// Error and settings types used by the email sinks.
pub mod types;

pub use service::{EmailService, MockEmailService, SmtpEmailService};
pub use types::{NotificationError, SmtpSettings};
