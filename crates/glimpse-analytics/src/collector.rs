use std::time::Duration;

use tracing::debug;

use glimpse_core::{ANALYTICS_TIMEOUT_MS, COLLECTOR_USER_AGENT};

use crate::event::PageView;

/// Errors raised while delivering an analytics event.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("Analytics request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Analytics endpoint returned status {0}")]
    Status(u16),

    #[error("Failed to serialize analytics payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// GA4 Measurement Protocol client.
///
/// Holds one reqwest client configured with the delivery timeout; a single
/// instance is created at startup and shared across requests.
pub struct GaCollector {
    http_client: reqwest::Client,
    collect_url: String,
    measurement_id: String,
    api_secret: String,
}

impl GaCollector {
    pub fn new(endpoint_base: &str, measurement_id: String, api_secret: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(ANALYTICS_TIMEOUT_MS))
            .user_agent(COLLECTOR_USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            collect_url: format!("{}/mp/collect", endpoint_base.trim_end_matches('/')),
            measurement_id,
            api_secret,
        }
    }

    /// Send one page view to the collection endpoint.
    ///
    /// At most one delivery attempt is made; the timeout is enforced by the
    /// client. The caller decides what to do with failures.
    pub async fn send_page_view(&self, page_view: &PageView) -> Result<(), AnalyticsError> {
        let payload = serde_json::to_string(&page_view.to_payload())?;

        let response = self
            .http_client
            .post(&self.collect_url)
            .query(&[
                ("measurement_id", self.measurement_id.as_str()),
                ("api_secret", self.api_secret.as_str()),
            ])
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyticsError::Status(status.as_u16()));
        }

        debug!(
            "Delivered page_view for client {} ({})",
            page_view.client_id, status
        );
        Ok(())
    }
}
