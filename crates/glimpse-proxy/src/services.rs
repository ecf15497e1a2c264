use async_trait::async_trait;

use glimpse_analytics::{GaCollector, PageView};
use glimpse_core::Settings;

use crate::traits::{PageViewSink, TrackingError};

/// Implementation of PageViewSink backed by the GA4 Measurement Protocol
pub struct GaEventSink {
    collector: GaCollector,
}

impl GaEventSink {
    pub fn new(collector: GaCollector) -> Self {
        Self { collector }
    }

    /// Build the sink from process settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(GaCollector::new(
            &settings.ga_endpoint,
            settings.measurement_id.clone(),
            settings.api_secret.clone(),
        ))
    }
}

#[async_trait]
impl PageViewSink for GaEventSink {
    async fn deliver(&self, page_view: PageView) -> Result<(), TrackingError> {
        self.collector.send_page_view(&page_view).await?;
        Ok(())
    }
}
