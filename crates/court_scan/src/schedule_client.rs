use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::scan_types::ScanError;

/// Source of one day's schedule markup
#[async_trait]
pub trait ScheduleFetcher: Send + Sync {
    /// URL requested for `date` (`DD.MM.YYYY`), used in log messages
    fn schedule_url(&self, date: &str) -> String;

    /// Fetch the raw schedule page for `date`
    async fn fetch_schedule(&self, date: &str) -> Result<String, ScanError>;
}

/// HTTP client for the booking site's daily schedule page
pub struct ScheduleClient {
    client: Client,
    base_url: String,
}

impl ScheduleClient {
    /// Create a client requesting `{base_url}{DD.MM.YYYY}`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ScanError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ScanError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ScheduleFetcher for ScheduleClient {
    fn schedule_url(&self, date: &str) -> String {
        format!("{}{}", self.base_url, date)
    }

    async fn fetch_schedule(&self, date: &str) -> Result<String, ScanError> {
        let url = self.schedule_url(date);
        debug!("Fetching schedule from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScanError::Network {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        debug!("Schedule response status: {}", status);

        if !status.is_success() {
            return Err(ScanError::Http {
                status: status.as_u16(),
                url,
            });
        }

        response.text().await.map_err(|e| ScanError::Network {
            url,
            message: e.to_string(),
        })
    }
}
