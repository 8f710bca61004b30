use std::sync::Arc;

use chrono::{Local, NaiveDate};
use notification_services::EmailService;
use rand::Rng;
use tracing::info;

use crate::config::CheckerConfig;
use crate::differ::{DiffOutcome, diff};
use crate::notification_service::{AvailabilityNotifier, NotifyOutcome};
use crate::run_log::RunLog;
use crate::scan_types::{NotificationBatch, ScanError};
use crate::scanner::Scanner;
use crate::schedule_client::ScheduleFetcher;
use crate::schedule_parser::ScheduleParser;
use crate::state_store::StateStore;
use crate::watchdog::{Watchdog, WatchdogState};

/// A heartbeat is written to the info log on roughly one run in this many
const HEARTBEAT_ONE_IN: u32 = 12;

/// What one checker run did
#[derive(Debug)]
pub struct RunSummary {
    /// Slots reported as newly available
    pub notified: NotificationBatch,
    /// Delivery result of the availability email
    pub notify_outcome: NotifyOutcome,
    /// Slots written to the state file
    pub persisted_slots: usize,
    /// Dates whose schedule could not be read
    pub failed_dates: Vec<NaiveDate>,
    /// Watchdog verdict
    pub watchdog: WatchdogState,
}

/// Runs one full check: load, scan, diff, save, notify, watchdog
pub struct ScanExecutor {
    run_log: RunLog,
    state_store: StateStore,
    scanner: Scanner,
    notifier: AvailabilityNotifier,
    watchdog: Watchdog,
}

impl ScanExecutor {
    /// Wire the stages from `config` around the given collaborators
    pub fn new(
        config: &CheckerConfig,
        fetcher: Arc<dyn ScheduleFetcher>,
        email_service: Arc<dyn EmailService>,
    ) -> Result<Self, ScanError> {
        let parser = ScheduleParser::new(config.hour_window(), config.resource_label.clone())?;

        Ok(Self {
            run_log: RunLog::new(&config.error_log_path, &config.info_log_path),
            state_store: StateStore::new(&config.availability_file),
            scanner: Scanner::new(
                fetcher,
                parser,
                config.look_ahead_days,
                config.request_delay,
            ),
            notifier: AvailabilityNotifier::new(
                email_service.clone(),
                config.email_receivers.clone(),
                config.email_subject.clone(),
                config.availability_update_message.clone(),
            ),
            watchdog: Watchdog::new(
                email_service,
                config.admin_email.clone(),
                config.error_threshold,
            ),
        })
    }

    /// Run the check for the window starting today
    pub async fn run_once(&self) -> RunSummary {
        self.run_for(Local::now().date_naive()).await
    }

    /// Run the check for the window starting at `today`
    ///
    /// Every stage handles its own failures; later stages always run.
    pub async fn run_for(&self, today: NaiveDate) -> RunSummary {
        let heartbeat = rand::rng().random_ratio(1, HEARTBEAT_ONE_IN);
        if heartbeat {
            self.run_log.info("Starting to run");
        }

        let previous = self.state_store.load(&self.run_log);
        let scan = self.scanner.scan(today, &self.run_log).await;

        let DiffOutcome {
            to_notify,
            next_state,
        } = diff(&previous, scan.snapshot);

        if !to_notify.is_empty() {
            info!("Found {} newly available slot(s)", to_notify.len());
        }

        // Saved before notifying, whatever the email delivery does
        self.state_store.save(&next_state, &self.run_log);

        let notify_outcome = self.notifier.notify(&to_notify, &self.run_log).await;

        let watchdog = self
            .watchdog
            .run(&self.run_log, Local::now().naive_local())
            .await;

        RunSummary {
            notified: to_notify,
            notify_outcome,
            persisted_slots: next_state.len(),
            failed_dates: scan.failures.iter().map(|failure| failure.date).collect(),
            watchdog,
        }
    }

    /// The run log shared by all stages
    pub fn run_log(&self) -> &RunLog {
        &self.run_log
    }

    /// The availability state file
    pub fn state_store(&self) -> &StateStore {
        &self.state_store
    }
}
