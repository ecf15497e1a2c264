use async_trait::async_trait;

use glimpse_analytics::{AnalyticsError, PageView};

/// Trait for delivering captured page views to an analytics backend
///
/// The proxy hands events to this seam from a detached task and never
/// awaits the outcome on the request path. Implementations own their
/// transport, retries and credentials.
#[async_trait]
pub trait PageViewSink: Send + Sync {
    /// Deliver a single page view to the backend
    async fn deliver(&self, page_view: PageView) -> Result<(), TrackingError>;
}

/// Error types for tracking services
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Analytics delivery failed: {0}")]
    Delivery(#[from] AnalyticsError),
}
