//! GA4 Measurement Protocol client.
//!
//! Builds the `page_view` event payload for an eligible proxied request and
//! delivers it with a single POST to the collection endpoint. Delivery is
//! best effort: one attempt, bounded by a fixed timeout, no retry.

pub mod collector;
pub mod event;

pub use collector::{AnalyticsError, GaCollector};
pub use event::{CollectEvent, CollectPayload, PageView, PageViewParams};
