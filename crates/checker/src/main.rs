//! Entry point of the court availability checker.
//! Runs one scan cycle and exits; scheduling is left to cron or a systemd timer.

use std::sync::Arc;

use anyhow::Context;
use court_scan::{CheckerConfig, NotifyOutcome, ScanExecutor, ScheduleClient, WatchdogState};
use notification_services::{EmailService, MockEmailService, SmtpEmailService};

fn create_email_service(config: &CheckerConfig) -> anyhow::Result<Arc<dyn EmailService>> {
    if config.mock_email {
        log::info!("📧 Using mock email service, nothing will be sent");
        return Ok(Arc::new(MockEmailService));
    }

    let service = SmtpEmailService::new(&config.smtp_settings())
        .context("failed to initialize SMTP email service")?;
    log::info!(
        "📧 SMTP email service initialized for {}:{}",
        config.smtp_host,
        config.smtp_port
    );
    Ok(Arc::new(service))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = CheckerConfig::from_env().context("invalid checker configuration")?;
    log::debug!("Loaded configuration: {:?}", config);

    let fetcher = Arc::new(
        ScheduleClient::new(config.base_url.clone()).context("failed to create schedule client")?,
    );
    let email_service = create_email_service(&config)?;

    let executor = ScanExecutor::new(&config, fetcher, email_service)
        .context("failed to set up scan executor")?;

    log::info!(
        "🚀 Checking {} day(s) between {}:00 and {}:00",
        config.look_ahead_days,
        config.from_hour,
        config.to_hour
    );

    let summary = executor.run_once().await;

    match summary.notify_outcome {
        NotifyOutcome::Sent => log::info!("✅ Reported {} new slot(s)", summary.notified.len()),
        NotifyOutcome::Failed => log::warn!(
            "❌ {} new slot(s) found but the email failed",
            summary.notified.len()
        ),
        NotifyOutcome::Skipped => log::info!("No new slots"),
    }

    if !summary.failed_dates.is_empty() {
        log::warn!("{} date(s) could not be scanned", summary.failed_dates.len());
    }

    if let WatchdogState::Alert { recent_errors } = summary.watchdog {
        log::warn!("🚨 {} errors in the past 24 hours, admin alerted", recent_errors);
    }

    log::info!("🗃️ {} slot(s) tracked", summary.persisted_slots);
    Ok(())
}
