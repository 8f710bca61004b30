use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use notification_services::EmailService;
use tracing::{debug, warn};

use crate::run_log::{LogRecord, RunLog};

/// Length of the rolling error window
pub fn error_window() -> Duration {
    Duration::hours(24)
}

/// Result of one watchdog pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// Error count at or below the threshold
    Idle {
        /// Errors inside the window
        recent_errors: usize,
    },
    /// Error count above the threshold, the admin gets an email
    Alert {
        /// Errors inside the window
        recent_errors: usize,
    },
}

impl WatchdogState {
    /// Errors counted inside the window
    pub fn recent_errors(&self) -> usize {
        match self {
            WatchdogState::Idle { recent_errors } | WatchdogState::Alert { recent_errors } => {
                *recent_errors
            }
        }
    }
}

/// Alerts the administrator when the checker itself keeps failing
pub struct Watchdog {
    email_service: Arc<dyn EmailService>,
    admin_email: String,
    error_threshold: usize,
}

impl Watchdog {
    /// Create a watchdog alerting `admin_email` above `error_threshold` errors
    pub fn new(
        email_service: Arc<dyn EmailService>,
        admin_email: impl Into<String>,
        error_threshold: usize,
    ) -> Self {
        Self {
            email_service,
            admin_email: admin_email.into(),
            error_threshold,
        }
    }

    /// Count recent errors and decide whether to alert, without sending anything
    ///
    /// An error log that cannot be read counts as idle.
    pub fn evaluate(&self, run_log: &RunLog, now: NaiveDateTime) -> WatchdogState {
        let recent_errors = match run_log.read_errors() {
            Ok(contents) => count_recent_errors(&contents, now),
            Err(e) => {
                warn!(
                    "Cannot read error log {}: {}",
                    run_log.error_path().display(),
                    e
                );
                0
            }
        };

        if recent_errors > self.error_threshold {
            WatchdogState::Alert { recent_errors }
        } else {
            WatchdogState::Idle { recent_errors }
        }
    }

    /// Evaluate the error log and email the administrator when over the threshold
    ///
    /// Every pass over the threshold alerts again.
    pub async fn run(&self, run_log: &RunLog, now: NaiveDateTime) -> WatchdogState {
        let state = self.evaluate(run_log, now);

        match state {
            WatchdogState::Idle { recent_errors } => {
                debug!("{} error(s) in the past 24 hours", recent_errors);
            }
            WatchdogState::Alert { recent_errors } => {
                self.send_alert(recent_errors, run_log).await;
            }
        }

        state
    }

    async fn send_alert(&self, recent_errors: usize, run_log: &RunLog) {
        let subject = "Availability checker error alert";
        let body = format!(
            "More than {} errors occurred in the past 24 hours ({} recorded).\n\
             Check the error log at {}.",
            self.error_threshold,
            recent_errors,
            run_log.error_path().display()
        );

        match self
            .email_service
            .send_email(std::slice::from_ref(&self.admin_email), subject, &body)
            .await
        {
            Ok(_) => run_log.info(&format!(
                "Admin alert sent: {} errors in the past 24 hours",
                recent_errors
            )),
            Err(e) => run_log.error(&format!("Failed to send admin alert: {}", e)),
        }
    }
}

/// Count error log lines stamped within the window ending at `now`
///
/// Lines without a parseable timestamp are skipped.
pub fn count_recent_errors(contents: &str, now: NaiveDateTime) -> usize {
    let cutoff = now - error_window();

    contents
        .lines()
        .filter_map(LogRecord::parse)
        .filter(|record| record.timestamp >= cutoff && record.timestamp <= now)
        .count()
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use notification_services::NotificationError;

    use super::*;

    const THRESHOLD: usize = 10;

    #[derive(Default)]
    struct RecordingEmailService {
        sent: Mutex<Vec<(Vec<String>, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl EmailService for RecordingEmailService {
        async fn send_email(
            &self,
            to: &[String],
            _subject: &str,
            body: &str,
        ) -> Result<String, NotificationError> {
            if self.fail {
                return Err(NotificationError::Smtp("timed out".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.to_vec(), body.to_string()));
            Ok("250 OK".to_string())
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn error_log(recent: usize, old: usize) -> String {
        let mut contents = String::new();
        for i in 0..old {
            let at = now() - Duration::hours(25) - Duration::minutes(i as i64);
            writeln!(contents, "{}", LogRecord::at(at, "old failure").to_line()).unwrap();
        }
        for i in 0..recent {
            let at = now() - Duration::minutes(10 * i as i64);
            writeln!(contents, "{}", LogRecord::at(at, "recent failure").to_line()).unwrap();
        }
        contents
    }

    fn fixture(contents: &str) -> (tempfile::TempDir, RunLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("error.log"), dir.path().join("info.log"));
        std::fs::write(log.error_path(), contents).unwrap();
        (dir, log)
    }

    fn watchdog(service: Arc<RecordingEmailService>) -> Watchdog {
        Watchdog::new(service, "admin@example.com", THRESHOLD)
    }

    #[test]
    fn test_count_ignores_entries_outside_window() {
        assert_eq!(count_recent_errors(&error_log(3, 5), now()), 3);

        let edge = LogRecord::at(now() - error_window(), "edge").to_line();
        let future = LogRecord::at(now() + Duration::minutes(1), "future").to_line();
        assert_eq!(count_recent_errors(&format!("{edge}\n{future}\n"), now()), 1);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let contents = format!(
            "garbage\n[not a date] boom\n2030-01-02 11:00:00 no brackets\n\n{}",
            error_log(2, 0)
        );
        assert_eq!(count_recent_errors(&contents, now()), 2);
    }

    #[tokio::test]
    async fn test_threshold_plus_one_alerts_admin() {
        let (_dir, log) = fixture(&error_log(THRESHOLD + 1, 20));
        let service = Arc::new(RecordingEmailService::default());

        let state = watchdog(service.clone()).run(&log, now()).await;

        assert_eq!(
            state,
            WatchdogState::Alert {
                recent_errors: THRESHOLD + 1
            }
        );
        let sent = service.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, vec!["admin@example.com".to_string()]);
        assert!(sent[0].1.contains("More than 10 errors occurred in the past 24 hours"));

        let info = std::fs::read_to_string(log.info_path()).unwrap();
        assert!(info.contains("Admin alert sent"));
    }

    #[tokio::test]
    async fn test_exact_threshold_stays_idle() {
        let (_dir, log) = fixture(&error_log(THRESHOLD, 20));
        let service = Arc::new(RecordingEmailService::default());

        let state = watchdog(service.clone()).run(&log, now()).await;

        assert_eq!(
            state,
            WatchdogState::Idle {
                recent_errors: THRESHOLD
            }
        );
        assert!(service.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_non_utf8_line_still_alerts() {
        let mut contents = b"[2001-01-01 00:00:00] legacy caf\xe9 line\n".to_vec();
        contents.extend_from_slice(error_log(15, 0).as_bytes());
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("error.log"), dir.path().join("info.log"));
        std::fs::write(log.error_path(), contents).unwrap();
        let service = Arc::new(RecordingEmailService::default());

        let state = watchdog(service.clone()).run(&log, now()).await;

        assert_eq!(state, WatchdogState::Alert { recent_errors: 15 });
        assert_eq!(service.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_error_log_is_idle() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("error.log"), dir.path().join("info.log"));
        let service = Arc::new(RecordingEmailService::default());

        let state = watchdog(service).run(&log, now()).await;

        assert_eq!(state, WatchdogState::Idle { recent_errors: 0 });
    }

    #[tokio::test]
    async fn test_every_run_over_threshold_alerts_again() {
        let (_dir, log) = fixture(&error_log(THRESHOLD + 5, 0));
        let service = Arc::new(RecordingEmailService::default());
        let watchdog = watchdog(service.clone());

        watchdog.run(&log, now()).await;
        watchdog.run(&log, now()).await;

        assert_eq!(service.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_alert_is_logged() {
        let (_dir, log) = fixture(&error_log(THRESHOLD + 1, 0));
        let service = Arc::new(RecordingEmailService {
            fail: true,
            ..Default::default()
        });

        let state = watchdog(service).run(&log, now()).await;

        assert!(matches!(state, WatchdogState::Alert { .. }));
        let errors = log.read_errors().unwrap();
        assert!(errors.contains("Failed to send admin alert: SMTP error: timed out"));
    }
}
