use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::run_log::RunLog;
use crate::scan_types::{SLOT_DATE_FORMAT, ScanError, SlotId, Snapshot};
use crate::schedule_client::ScheduleFetcher;
use crate::schedule_parser::ScheduleParser;

/// A date whose schedule could not be read
#[derive(Debug)]
pub struct FetchFailure {
    /// The date that contributed nothing to the snapshot
    pub date: NaiveDate,
    /// What went wrong
    pub error: ScanError,
}

/// Result of scanning the whole look-ahead window
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Slots available across all readable dates, in discovery order
    pub snapshot: Snapshot,
    /// One entry per date that failed
    pub failures: Vec<FetchFailure>,
}

/// Walks the look-ahead window one date at a time and collects available slots
pub struct Scanner {
    fetcher: Arc<dyn ScheduleFetcher>,
    parser: ScheduleParser,
    look_ahead_days: u32,
    request_delay: Duration,
}

impl Scanner {
    /// Create a scanner over `look_ahead_days` dates, pausing `request_delay`
    /// before every request
    pub fn new(
        fetcher: Arc<dyn ScheduleFetcher>,
        parser: ScheduleParser,
        look_ahead_days: u32,
        request_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            parser,
            look_ahead_days,
            request_delay,
        }
    }

    /// Scan `today` and the following dates of the window
    ///
    /// A failing date is logged to the error log and skipped; the remaining
    /// dates are still scanned.
    pub async fn scan(&self, today: NaiveDate, run_log: &RunLog) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        for offset in 0..self.look_ahead_days {
            let Some(date) = today.checked_add_days(Days::new(u64::from(offset))) else {
                break;
            };

            // Keep the request rate low for the booking site
            sleep(self.request_delay).await;

            match self.scan_date(date).await {
                Ok(slots) => {
                    debug!("{} available slot(s) on {}", slots.len(), date);
                    outcome.snapshot.extend(slots);
                }
                Err(error) => {
                    let label = date.format(SLOT_DATE_FORMAT).to_string();
                    run_log.error(&failure_message(&self.fetcher.schedule_url(&label), &error));
                    outcome.failures.push(FetchFailure { date, error });
                }
            }
        }

        info!(
            "Scan finished: {} available slot(s), {} failed date(s)",
            outcome.snapshot.len(),
            outcome.failures.len()
        );

        outcome
    }

    async fn scan_date(&self, date: NaiveDate) -> Result<Vec<SlotId>, ScanError> {
        let label = date.format(SLOT_DATE_FORMAT).to_string();
        let html = self.fetcher.fetch_schedule(&label).await?;
        self.parser.parse(&html, date)
    }
}

fn failure_message(url: &str, error: &ScanError) -> String {
    match error {
        ScanError::Parse(reason) => format!(
            "Error processing HTML content from URL: {}, error: {}",
            url, reason
        ),
        other => other.to_string(),
    }
}
