use std::sync::Arc;

use notification_services::EmailService;
use tracing::debug;

use crate::run_log::RunLog;
use crate::scan_types::SlotId;

/// What happened to one notification batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The batch was empty, nothing was sent
    Skipped,
    /// The message was handed to the email sink
    Sent,
    /// The email sink failed; the failure is in the error log
    Failed,
}

/// Emails subscribers about newly available slots
pub struct AvailabilityNotifier {
    email_service: Arc<dyn EmailService>,
    recipients: Vec<String>,
    subject: String,
    preamble: String,
}

impl AvailabilityNotifier {
    /// Create a notifier sending `subject` to `recipients`; the body starts with `preamble`
    pub fn new(
        email_service: Arc<dyn EmailService>,
        recipients: Vec<String>,
        subject: impl Into<String>,
        preamble: impl Into<String>,
    ) -> Self {
        Self {
            email_service,
            recipients,
            subject: subject.into(),
            preamble: preamble.into(),
        }
    }

    /// Send one message listing `batch`
    ///
    /// A delivery failure is logged and reported as [`NotifyOutcome::Failed`],
    /// never returned as an error.
    pub async fn notify(&self, batch: &[SlotId], run_log: &RunLog) -> NotifyOutcome {
        if batch.is_empty() {
            debug!("No new availability, skipping notification");
            return NotifyOutcome::Skipped;
        }

        let body = self.create_notification_body(batch);

        match self
            .email_service
            .send_email(&self.recipients, &self.subject, &body)
            .await
        {
            Ok(message_id) => {
                debug!("Notification accepted: {}", message_id);
                let slots: Vec<&str> = batch.iter().map(SlotId::as_str).collect();
                run_log.info(&format!("Email sent successfully: {:?}", slots));
                NotifyOutcome::Sent
            }
            Err(e) => {
                run_log.error(&format!("Failed to send email: {}", e));
                NotifyOutcome::Failed
            }
        }
    }

    /// Preamble followed by the slot lines
    pub fn create_notification_body(&self, batch: &[SlotId]) -> String {
        format!("{}{}", self.preamble, format_slot_lines(batch))
    }
}

/// One line per slot, with a blank line before every new date group
pub fn format_slot_lines(batch: &[SlotId]) -> String {
    let mut lines: Vec<&str> = Vec::with_capacity(batch.len());
    let mut last_date: Option<&str> = None;

    for slot in batch {
        let date = slot.date_part();
        if last_date.is_some_and(|last| last != date) {
            lines.push("");
        }
        last_date = Some(date);
        lines.push(slot.as_str());
    }

    lines.join("\n")
}
