//! Glimpse Proxy - Pingora-based tracking reverse proxy
//!
//! Forwards HTTP traffic to a configured origin while:
//! - deciding per request whether the page view is worth tracking
//! - resolving or minting a durable `client_id` for the browser
//! - mirroring eligible page views to GA4 in the background
//! - attaching the `client_id` cookie to successful responses

pub mod eligibility;
pub mod identity;
pub mod proxy;
pub mod server;
pub mod services;
pub mod traits;

#[cfg(test)]
pub mod integration_test;

// Re-export main types and functions
pub use eligibility::*;
pub use identity::*;
pub use proxy::*;
pub use server::*;
pub use services::*;
pub use traits::*;
